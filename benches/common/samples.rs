use once_cell::sync::Lazy;
use tspline_extraction::{BasisOptions, TSplineControlMesh};

/// Uniform bicubic B-spline strip of 4 elements
pub static STRIP_TEXT: &str = include_str!("../../data/strip.tsp");

pub static STRIP: Lazy<TSplineControlMesh> = Lazy::new(|| {
    TSplineControlMesh::parse(STRIP_TEXT, &BasisOptions::default()).expect("sample data is valid")
});

/// Chart coordinates spread over all elements of the strip, including element boundaries
pub static POINTS: Lazy<Vec<[f64; 2]>> = Lazy::new(|| {
    (0..4)
        .flat_map(|e| {
            (0..=4).flat_map(move |i| {
                (0..=4).map(move |j| [3.0 * e as f64 + i as f64 / 2.0, -1.0 + j as f64 / 2.0])
            })
        })
        .collect()
});

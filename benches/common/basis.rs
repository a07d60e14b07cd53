use criterion::{black_box, Criterion};
use tspline_extraction::bernstein::tensor_product;
use tspline_extraction::extraction::{ParseOptions, Patch};
use tspline_extraction::{ControlMesh, ScalarBasis};

use crate::common::samples::{POINTS, STRIP, STRIP_TEXT};

pub fn bernstein(c: &mut Criterion) {
    c.bench_function("bernstein", |b| {
        b.iter(|| black_box(tensor_product(black_box(0.3), black_box(-0.7))))
    });
}

pub fn evaluate(c: &mut Criterion) {
    let basis = STRIP.scalar_spline();
    c.bench_function("nodes_and_evals", |b| {
        b.iter(|| {
            for &xi in POINTS.iter() {
                black_box(basis.nodes_and_evals(xi).unwrap());
            }
        })
    });
}

pub fn parse(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| black_box(Patch::parse_with(STRIP_TEXT, &ParseOptions::default()).unwrap()))
    });
}

pub fn all(c: &mut Criterion) {
    bernstein(c);
    evaluate(c);
    parse(c);
}

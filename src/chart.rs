//! The unrolled coordinate chart shared by all elements of a patch.
//!
//! Every bezier element gets its own disjoint rectangle on a single 2D chart:
//! element `e` spans `[3e, 3e + 2]` along the first axis and `[-1, 1]` along the second.
//! The unit gap between neighbours keeps element boundaries away from each other,
//! so a point can be assigned to an element by rounding alone.

use nalgebra::Vector2;
use num::ToPrimitive;

use crate::error::IndexError;

/// Distance along the first axis between the starts of two neighbouring elements
pub const ELEMENT_SPACING: f64 = 3.0;

/// Length of an element along either axis, matching the bernstein domain `[-1, 1]`
pub const ELEMENT_WIDTH: f64 = 2.0;

/// Bias (in units of [`ELEMENT_SPACING`]) added before rounding down to an element index.
///
/// Points up to `BOUNDARY_MARGIN * ELEMENT_SPACING` left of an element's start
/// are still assigned to it, which absorbs rounding error at element boundaries.
/// Must stay below `(ELEMENT_SPACING - ELEMENT_WIDTH) / ELEMENT_SPACING`.
pub const BOUNDARY_MARGIN: f64 = 0.1;

/// A point of the chart resolved to an element and its local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementPoint {
    /// Index of the element
    pub element: usize,
    /// Local coordinate along the first axis, `[-1, 1]` inside the element
    pub u: f64,
    /// Local coordinate along the second axis, `[-1, 1]` inside the element
    pub v: f64,
}

/// Resolves the global chart coordinate `xi` into an element of a patch
/// with `element_count` elements.
pub fn locate(xi: [f64; 2], element_count: usize) -> Result<ElementPoint, IndexError> {
    let [x0, x1] = xi;
    if !x0.is_finite() || !x1.is_finite() {
        return Err(IndexError::NonFiniteCoordinate { x0, x1 });
    }

    let raw = (x0 / ELEMENT_SPACING + BOUNDARY_MARGIN).floor();
    let element = raw
        .to_usize()
        .filter(|&element| element < element_count)
        .ok_or(IndexError::ElementOutOfRange {
            x0,
            element: raw as i64,
            count: element_count,
        })?;

    Ok(ElementPoint {
        element,
        u: x0 - element_start(element) - 1.0,
        v: x1,
    })
}

/// The inverse of [`locate`]: maps local coordinates of `element` back onto the chart.
pub fn to_global(element: usize, u: f64, v: f64) -> [f64; 2] {
    [element_start(element) + u + 1.0, v]
}

/// First axis coordinate where `element` starts
#[inline]
pub fn element_start(element: usize) -> f64 {
    ELEMENT_SPACING * element as f64
}

/// The corners of `element` in the order bottom-left, bottom-right, top-left, top-right.
pub fn element_corners(element: usize) -> [Vector2<f64>; 4] {
    let x0 = element_start(element);
    let x1 = x0 + ELEMENT_WIDTH;
    let (y0, y1) = (-1.0, 1.0);
    [
        Vector2::new(x0, y0),
        Vector2::new(x1, y0),
        Vector2::new(x0, y1),
        Vector2::new(x1, y1),
    ]
}

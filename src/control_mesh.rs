//! Homogeneous control points mapping the parametric chart to physical space.

use std::fs;
use std::path::Path;

use nalgebra::dimension::{Const, Dynamic};
use nalgebra::OMatrix;

use crate::basis::{BasisOptions, ScalarBasis, TSplineScalarBasis};
use crate::error::{FormatError, IndexError};
use crate::extraction::{LineCursor, Patch, CONTROL_POINT_OFFSET};

/// Number of spatial dimensions
pub const NSD: usize = 3;

/// Number of homogeneous coordinates per control point, the spatial ones plus the weight
pub const HOMOGENEOUS_DIM: usize = NSD + 1;

/// Homogeneous control points, one row `(x w, y w, z w, w)` per node.
pub type HomogeneousPoints = OMatrix<f64, Dynamic, Const<HOMOGENEOUS_DIM>>;

/// What an analysis engine needs to build the physical mapping of a spline.
pub trait ControlMesh {
    /// Basis the control points belong to
    type Basis: ScalarBasis;

    /// Coordinate `direction` of the homogeneous control point `node`.
    ///
    /// Directions below [`ControlMesh::nsd`] are spatial coordinates multiplied by the weight,
    /// direction `nsd` is the weight itself.
    fn homogeneous_coordinate(&self, node: usize, direction: usize) -> Result<f64, IndexError>;

    /// The scalar basis
    fn scalar_spline(&self) -> &Self::Basis;

    /// Number of spatial dimensions
    fn nsd(&self) -> usize;
}

/// Control points of a T-spline patch together with its extraction basis.
#[derive(Clone, Debug)]
pub struct TSplineControlMesh {
    scalar_spline: TSplineScalarBasis,
    bnet: HomogeneousPoints,
}

impl TSplineControlMesh {
    /// Parses extraction data and control points from the same `text`.
    pub fn parse(text: &str, options: &BasisOptions) -> Result<Self, FormatError> {
        let patch = Patch::parse_with(text, &options.parse)?;
        let bnet = parse_control_points(text, patch.ncp())?;
        log::debug!("parsed {} homogeneous control points", bnet.nrows());
        Ok(TSplineControlMesh {
            scalar_spline: TSplineScalarBasis::new(patch, options),
            bnet,
        })
    }

    /// Reads extraction data and control points from the file at `path`.
    pub fn open(path: impl AsRef<Path>, options: &BasisOptions) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        TSplineControlMesh::parse(&text, options)
    }

    /// All homogeneous control points
    pub fn control_points(&self) -> &HomogeneousPoints {
        &self.bnet
    }
}

/// Reads `ncp` lines of `tag x y z w` and homogenizes them.
fn parse_control_points(text: &str, ncp: usize) -> Result<HomogeneousPoints, FormatError> {
    let mut cursor = LineCursor::new(text);
    cursor.skip(CONTROL_POINT_OFFSET, "header")?;

    let mut bnet = HomogeneousPoints::zeros_generic(Dynamic::new(ncp), Const::<HOMOGENEOUS_DIM>);
    for node in 0..ncp {
        let line = cursor.next_line("control point")?;
        for direction in 0..=NSD {
            bnet[(node, direction)] = line.real(direction + 1, "control point coordinate")?;
        }
        let weight = bnet[(node, NSD)];
        if weight <= 0.0 {
            return Err(FormatError::NonPositiveWeight {
                line: line.number,
                node,
                weight,
            });
        }
    }

    let weights = bnet.column(NSD).clone_owned();
    for mut column in bnet.fixed_columns_mut::<NSD>(0).column_iter_mut() {
        column.component_mul_assign(&weights);
    }
    Ok(bnet)
}

impl ControlMesh for TSplineControlMesh {
    type Basis = TSplineScalarBasis;

    fn homogeneous_coordinate(&self, node: usize, direction: usize) -> Result<f64, IndexError> {
        if node >= self.bnet.nrows() {
            return Err(IndexError::NodeOutOfRange {
                node,
                ncp: self.bnet.nrows(),
            });
        }
        if direction > NSD {
            return Err(IndexError::DirectionOutOfRange { direction, nsd: NSD });
        }
        Ok(self.bnet[(node, direction)])
    }

    fn scalar_spline(&self) -> &TSplineScalarBasis {
        &self.scalar_spline
    }

    fn nsd(&self) -> usize {
        NSD
    }
}

#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod basis;
pub mod bernstein;
pub mod chart;
pub mod collective;
pub mod control_mesh;
pub mod error;
pub mod extraction;
pub mod mesh;
pub mod npolynomial;

pub use crate::basis::{BasisOptions, ScalarBasis, TSplineScalarBasis};
pub use crate::control_mesh::{ControlMesh, TSplineControlMesh};
pub use crate::error::{Error, Result};
pub use crate::extraction::{ParseOptions, Patch};
pub use crate::mesh::{CellType, DegenerateMesh};

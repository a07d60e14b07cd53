//! Scalar spline basis built from bezier extraction data.

use std::path::Path;

use crate::bernstein::tensor_product;
use crate::chart::{self, ElementPoint};
use crate::collective::{write_then_read, Communicator, SharedStore};
use crate::error::{FormatError, IndexError, Result};
use crate::extraction::{ParseOptions, Patch};
use crate::mesh::{CellType, DegenerateMesh};

pub use crate::extraction::NodesAndEvals;

/// Default name of the shared mesh artifact
pub const MESH_FILE_NAME: &str = "mesh.xml";

/// What an analysis engine needs from a scalar spline basis.
pub trait ScalarBasis {
    /// Upper bound on the number of basis functions which are non-zero at a single point,
    /// used to preallocate sparse matrix rows.
    fn prealloc(&self) -> usize;

    /// Whether [`ScalarBasis::generate_mesh`] produces quadrilaterals instead of triangles
    fn use_rectangular_elements(&self) -> bool;

    /// Whether the extraction needs discontinuous galerkin treatment
    fn needs_dg(&self) -> bool;

    /// Global node indices and values of all basis functions which are non-zero at the chart
    /// coordinate `xi`.
    fn nodes_and_evals(&self, xi: [f64; 2]) -> Result<NodesAndEvals>;

    /// Generates the mesh the basis functions are extracted onto.
    ///
    /// Collective: every participant of `comm` has to call this.
    fn generate_mesh(
        &self,
        comm: &dyn Communicator,
        store: &dyn SharedStore,
    ) -> Result<DegenerateMesh>;

    /// Number of control points i.e. global basis functions
    fn ncp(&self) -> usize;

    /// Polynomial degree of the mesh's function space
    fn degree(&self) -> usize;
}

/// Options for constructing a [`TSplineScalarBasis`].
#[derive(Clone, Debug, PartialEq)]
pub struct BasisOptions {
    /// Shape of the generated mesh's cells
    pub cell_type: CellType,

    /// Name of the mesh artifact inside the shared store
    pub mesh_name: String,

    /// Validation of the extraction data
    pub parse: ParseOptions,
}

impl Default for BasisOptions {
    fn default() -> Self {
        BasisOptions {
            cell_type: CellType::default(),
            mesh_name: MESH_FILE_NAME.to_owned(),
            parse: ParseOptions::default(),
        }
    }
}

impl BasisOptions {
    /// Default options using triangles instead of quadrilaterals
    pub fn triangles() -> Self {
        BasisOptions {
            cell_type: CellType::Triangle,
            ..BasisOptions::default()
        }
    }
}

/// T-spline basis given by per element bicubic bezier extraction.
///
/// All elements live side by side on the chart described in [`crate::chart`].
#[derive(Clone, Debug)]
pub struct TSplineScalarBasis {
    patch: Patch,
    cell_type: CellType,
    mesh_name: String,
}

impl TSplineScalarBasis {
    /// Wraps already parsed extraction data.
    pub fn new(patch: Patch, options: &BasisOptions) -> Self {
        TSplineScalarBasis {
            patch,
            cell_type: options.cell_type,
            mesh_name: options.mesh_name.clone(),
        }
    }

    /// Parses extraction data from `text`.
    pub fn parse(text: &str, options: &BasisOptions) -> std::result::Result<Self, FormatError> {
        let patch = Patch::parse_with(text, &options.parse)?;
        Ok(TSplineScalarBasis::new(patch, options))
    }

    /// Reads extraction data from the file at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        options: &BasisOptions,
    ) -> std::result::Result<Self, FormatError> {
        let patch = Patch::open(path, &options.parse)?;
        Ok(TSplineScalarBasis::new(patch, options))
    }

    /// The extraction data
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Number of bezier elements
    pub fn element_count(&self) -> usize {
        self.patch.element_count()
    }

    /// Shape of the generated mesh's cells
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Name of the mesh artifact
    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    /// Resolves the chart coordinate `xi` into an element and local coordinates.
    pub fn locate(&self, xi: [f64; 2]) -> std::result::Result<ElementPoint, IndexError> {
        chart::locate(xi, self.patch.element_count())
    }

    /// The degenerate mesh without going through the shared store
    pub fn mesh(&self) -> DegenerateMesh {
        DegenerateMesh::unrolled(self.patch.element_count(), self.cell_type)
    }
}

impl ScalarBasis for TSplineScalarBasis {
    fn prealloc(&self) -> usize {
        self.patch.max_nshl()
    }

    fn use_rectangular_elements(&self) -> bool {
        self.cell_type == CellType::Quadrilateral
    }

    fn needs_dg(&self) -> bool {
        false
    }

    fn nodes_and_evals(&self, xi: [f64; 2]) -> Result<NodesAndEvals> {
        let ElementPoint { element, u, v } = self.locate(xi)?;
        let element = self
            .patch
            .element(element)
            .ok_or(IndexError::ElementOutOfRange {
                x0: xi[0],
                element: element as i64,
                count: self.patch.element_count(),
            })?;
        Ok(element.basis_values(&tensor_product(u, v)))
    }

    fn generate_mesh(
        &self,
        comm: &dyn Communicator,
        store: &dyn SharedStore,
    ) -> Result<DegenerateMesh> {
        let xml = write_then_read(comm, store, &self.mesh_name, || self.mesh().to_xml())?;
        let mesh = DegenerateMesh::from_xml(&xml)?;
        log::debug!(
            "rank {} loaded {} mesh with {} vertices and {} cells",
            comm.rank(),
            mesh.cell_type(),
            mesh.vertices().len(),
            mesh.cells().len()
        );
        Ok(mesh)
    }

    fn ncp(&self) -> usize {
        self.patch.ncp()
    }

    fn degree(&self) -> usize {
        // Splitting a bicubic quad into triangles without midside nodes needs degree 6 per
        // triangle to reproduce the same functions.
        match self.cell_type {
            CellType::Quadrilateral => 3,
            CellType::Triangle => 6,
        }
    }
}

//! Degenerate meshes of the unrolled element chart and their xml representation.
//!
//! Every element contributes four private vertices, see [`crate::chart::element_corners`],
//! and either one quadrilateral or two triangles.
//! No vertex is shared between elements: continuity between elements is carried by the
//! basis functions alone.

use std::fmt;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::chart::element_corners;
use crate::error::CollectiveIoError;

/// Declaration written before the root element of a mesh artifact
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Namespace of the root element of a mesh artifact
pub const DOLFIN_NAMESPACE: &str = "http://www.fenics.org/dolfin/";

/// Vertex indices of a single cell.
pub type Cell = SmallVec<[usize; 4]>;

/// Shape of a mesh's cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellType {
    /// One quadrilateral per element
    #[default]
    Quadrilateral,

    /// Two triangles per element, split along the bottom-left to top-right diagonal
    Triangle,
}

impl CellType {
    /// Name used for the `celltype` attribute and the cell elements
    pub fn name(self) -> &'static str {
        match self {
            CellType::Quadrilateral => "quadrilateral",
            CellType::Triangle => "triangle",
        }
    }

    /// Inverse of [`CellType::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quadrilateral" => Some(CellType::Quadrilateral),
            "triangle" => Some(CellType::Triangle),
            _ => None,
        }
    }

    /// Number of cells covering one element
    pub fn cells_per_element(self) -> usize {
        match self {
            CellType::Quadrilateral => 1,
            CellType::Triangle => 2,
        }
    }

    /// Cells of the element whose corners start at vertex `first`
    fn element_cells(self, first: usize) -> SmallVec<[Cell; 2]> {
        let [v0, v1, v2, v3] = [first, first + 1, first + 2, first + 3];
        match self {
            CellType::Quadrilateral => smallvec![smallvec![v0, v1, v2, v3]],
            CellType::Triangle => smallvec![smallvec![v0, v1, v3], smallvec![v0, v3, v2]],
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A 2D mesh made of disconnected cells, one patch per bezier element.
#[derive(Clone, Debug, PartialEq)]
pub struct DegenerateMesh {
    cell_type: CellType,
    vertices: Vec<Vector2<f64>>,
    cells: Vec<Cell>,
}

impl DegenerateMesh {
    /// Lays out `element_count` elements on the unrolled chart.
    pub fn unrolled(element_count: usize, cell_type: CellType) -> Self {
        let mut vertices = Vec::with_capacity(4 * element_count);
        let mut cells = Vec::with_capacity(cell_type.cells_per_element() * element_count);
        for element in 0..element_count {
            let first = vertices.len();
            vertices.extend(element_corners(element));
            cells.extend(cell_type.element_cells(first));
        }
        DegenerateMesh {
            cell_type,
            vertices,
            cells,
        }
    }

    /// Shape of the cells
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Vertex coordinates
    pub fn vertices(&self) -> &[Vector2<f64>] {
        &self.vertices
    }

    /// Vertex indices of every cell
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Serializes the mesh into the xml artifact format.
    ///
    /// Coordinates use the shortest representation which parses back to the same value.
    pub fn to_xml(&self) -> Result<String, CollectiveIoError> {
        let document = DolfinDocument {
            namespace: DOLFIN_NAMESPACE.to_owned(),
            mesh: MeshElement {
                celltype: self.cell_type.name().to_owned(),
                dim: 2,
                vertices: VerticesElement {
                    size: self.vertices.len(),
                    vertices: self
                        .vertices
                        .iter()
                        .enumerate()
                        .map(|(index, vertex)| VertexElement {
                            index,
                            x: vertex.x,
                            y: vertex.y,
                        })
                        .collect(),
                },
                cells: CellsElement {
                    size: self.cells.len(),
                    cells: self
                        .cells
                        .iter()
                        .enumerate()
                        .map(|(index, cell)| CellElement::new(self.cell_type, index, cell))
                        .collect(),
                },
            },
        };
        let body = quick_xml::se::to_string(&document)?;
        Ok(format!("{}\n{}\n", XML_DECLARATION, body))
    }

    /// Parses a mesh artifact, checking it for consistency.
    pub fn from_xml(xml: &str) -> Result<Self, CollectiveIoError> {
        let document: DolfinDocument = quick_xml::de::from_str(xml)?;
        let MeshElement {
            celltype,
            dim,
            vertices,
            cells,
        } = document.mesh;

        let cell_type = CellType::from_name(&celltype)
            .ok_or_else(|| malformed(format!("unknown cell type {:?}", celltype)))?;
        if dim != 2 {
            return Err(malformed(format!("expected dimension 2, found {}", dim)));
        }
        if vertices.size != vertices.vertices.len() {
            return Err(malformed(format!(
                "declared {} vertices, found {}",
                vertices.size,
                vertices.vertices.len()
            )));
        }
        if cells.size != cells.cells.len() {
            return Err(malformed(format!(
                "declared {} cells, found {}",
                cells.size,
                cells.cells.len()
            )));
        }

        let mut points = Vec::with_capacity(vertices.size);
        for (position, vertex) in vertices.vertices.into_iter().enumerate() {
            if vertex.index != position {
                return Err(malformed(format!(
                    "vertex {} is listed at position {}",
                    vertex.index, position
                )));
            }
            points.push(Vector2::new(vertex.x, vertex.y));
        }

        let mut mesh_cells = Vec::with_capacity(cells.size);
        for (position, cell) in cells.cells.into_iter().enumerate() {
            let (index, vertices) = cell.into_parts(cell_type)?;
            if index != position {
                return Err(malformed(format!(
                    "cell {} is listed at position {}",
                    index, position
                )));
            }
            if let Some(&vertex) = vertices.iter().find(|&&vertex| vertex >= points.len()) {
                return Err(malformed(format!(
                    "cell {} references missing vertex {}",
                    index, vertex
                )));
            }
            mesh_cells.push(vertices);
        }

        Ok(DegenerateMesh {
            cell_type,
            vertices: points,
            cells: mesh_cells,
        })
    }
}

fn malformed(message: String) -> CollectiveIoError {
    CollectiveIoError::MalformedArtifact(message)
}

/* Xml schema */

fn dolfin_namespace() -> String {
    DOLFIN_NAMESPACE.to_owned()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "dolfin")]
struct DolfinDocument {
    #[serde(rename = "@xmlns:dolfin", skip_deserializing, default = "dolfin_namespace")]
    namespace: String,
    mesh: MeshElement,
}

#[derive(Debug, Serialize, Deserialize)]
struct MeshElement {
    #[serde(rename = "@celltype")]
    celltype: String,
    #[serde(rename = "@dim")]
    dim: usize,
    vertices: VerticesElement,
    cells: CellsElement,
}

#[derive(Debug, Serialize, Deserialize)]
struct VerticesElement {
    #[serde(rename = "@size")]
    size: usize,
    #[serde(default, rename = "vertex")]
    vertices: Vec<VertexElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VertexElement {
    #[serde(rename = "@index")]
    index: usize,
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CellsElement {
    #[serde(rename = "@size")]
    size: usize,
    #[serde(default, rename = "$value")]
    cells: Vec<CellElement>,
}

#[derive(Debug, Serialize, Deserialize)]
enum CellElement {
    #[serde(rename = "quadrilateral")]
    Quadrilateral {
        #[serde(rename = "@index")]
        index: usize,
        #[serde(rename = "@v0")]
        v0: usize,
        #[serde(rename = "@v1")]
        v1: usize,
        #[serde(rename = "@v2")]
        v2: usize,
        #[serde(rename = "@v3")]
        v3: usize,
    },
    #[serde(rename = "triangle")]
    Triangle {
        #[serde(rename = "@index")]
        index: usize,
        #[serde(rename = "@v0")]
        v0: usize,
        #[serde(rename = "@v1")]
        v1: usize,
        #[serde(rename = "@v2")]
        v2: usize,
    },
}

impl CellElement {
    fn new(cell_type: CellType, index: usize, cell: &Cell) -> Self {
        match cell_type {
            CellType::Quadrilateral => CellElement::Quadrilateral {
                index,
                v0: cell[0],
                v1: cell[1],
                v2: cell[2],
                v3: cell[3],
            },
            CellType::Triangle => CellElement::Triangle {
                index,
                v0: cell[0],
                v1: cell[1],
                v2: cell[2],
            },
        }
    }

    fn into_parts(self, expected: CellType) -> Result<(usize, Cell), CollectiveIoError> {
        let (cell_type, index, vertices): (_, _, Cell) = match self {
            CellElement::Quadrilateral { index, v0, v1, v2, v3 } => {
                (CellType::Quadrilateral, index, smallvec![v0, v1, v2, v3])
            }
            CellElement::Triangle { index, v0, v1, v2 } => {
                (CellType::Triangle, index, smallvec![v0, v1, v2])
            }
        };
        if cell_type != expected {
            return Err(malformed(format!(
                "{} cell {} in a {} mesh",
                cell_type, index, expected
            )));
        }
        Ok((index, vertices))
    }
}

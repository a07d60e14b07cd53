//! Loads a T-spline extraction file, evaluates its geometry at a few chart coordinates
//! and writes the degenerate mesh into the system's temporary directory.
//!
//! Usage: `cargo run --example evaluate [path] [quadrilateral|triangle]`

use std::env;

use tspline_extraction::chart;
use tspline_extraction::collective::{DirectoryStore, SerialCommunicator};
use tspline_extraction::{BasisOptions, CellType, ControlMesh, ScalarBasis, TSplineControlMesh};

fn main() -> tspline_extraction::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/data/strip.tsp").to_owned());
    let cell_type = args
        .next()
        .and_then(|name| CellType::from_name(&name))
        .unwrap_or_default();

    let options = BasisOptions {
        cell_type,
        ..BasisOptions::default()
    };
    let control_mesh = TSplineControlMesh::open(&path, &options)?;
    let basis = control_mesh.scalar_spline();
    println!(
        "{}: {} control points, {} elements, degree {}, at most {} functions per element",
        path,
        basis.ncp(),
        basis.element_count(),
        basis.degree(),
        basis.prealloc()
    );

    for element in 0..basis.element_count() {
        let xi = chart::to_global(element, 0.0, 0.0);
        let mut point = [0.0; 4];
        for (node, value) in basis.nodes_and_evals(xi)? {
            for (direction, sum) in point.iter_mut().enumerate() {
                *sum += value * control_mesh.homogeneous_coordinate(node, direction)?;
            }
        }
        let w = point[control_mesh.nsd()];
        println!(
            "element {} center {:?} -> ({:.6}, {:.6}, {:.6})",
            element,
            xi,
            point[0] / w,
            point[1] / w,
            point[2] / w
        );
    }

    let store = DirectoryStore::new(env::temp_dir());
    let mesh = basis.generate_mesh(&SerialCommunicator, &store)?;
    println!(
        "wrote {} mesh with {} vertices and {} cells to {}",
        mesh.cell_type(),
        mesh.vertices().len(),
        mesh.cells().len(),
        store.path(basis.mesh_name()).display()
    );
    Ok(())
}

//! Test a global tree built from sub-trees, where some ranks may hold no entities.

use bempp_bbtree::{
    mesh::{CellType, StructuredMesh},
    search::compute_collisions_trees,
    tree::BoundingBoxTree,
};
use itertools::Itertools;
use mpi::traits::Communicator;

pub fn main() {
    // Initialise MPI
    let universe = mpi::initialize().unwrap();

    // Get the world communicator
    let comm = universe.world();

    let rank = comm.rank() as usize;
    let size = comm.size() as usize;

    let n = 7;

    // Every rank creates the full mesh and owns a contiguous block of cells.
    let mut mesh = StructuredMesh::unit_cube(n, n, n, CellType::Hexahedron);
    let ncells = n * n * n;
    let owned = (rank * ncells / size)..((rank + 1) * ncells / size);

    // Mark the cells attached to the top facets.
    let facets = mesh
        .locate_entities_boundary(2, |x| (x[1] - 1.0).abs() < 1E-12)
        .unwrap();
    let facet_to_cells = mesh.entity_to_cells(2).unwrap();
    let cells = facets
        .iter()
        .map(|&facet| facet_to_cells.links(facet)[0])
        .filter(|cell| owned.contains(cell))
        .sorted()
        .dedup()
        .collect_vec();

    let sub_tree = BoundingBoxTree::new(&mesh, 3, Some(&cells), 0.0).unwrap();
    assert_eq!(sub_tree.is_empty(), cells.is_empty());

    let global_tree = sub_tree.create_global_tree(&comm);

    // Every rank has a leaf. Ranks without marked cells hold the empty box.
    assert_eq!(global_tree.num_bboxes(), 2 * size - 1);
    let contributing = global_tree
        .leaves()
        .filter(|(_, bbox)| !bbox.is_empty())
        .map(|(process, _)| process)
        .collect_vec();
    assert_eq!(contributing.contains(&rank), !cells.is_empty());

    let root = global_tree.root_bbox().unwrap();
    assert!((root.min()[1] - (n - 1) as f64 / n as f64).abs() < 1E-12);
    assert!((root.max()[1] - 1.0).abs() < 1E-12);

    let tree = BoundingBoxTree::new(&mesh, 3, None, 0.0).unwrap();
    let collisions = compute_collisions_trees(&tree, &global_tree);
    assert!(collisions.iter().all(|[_, process]| contributing.contains(process)));

    if rank == 0 {
        println!(
            "Global sub-tree has {} of {} ranks contributing.",
            contributing.len(),
            size
        );
    }
}

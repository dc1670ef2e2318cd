//! Test that the global tree reports every process holding a colliding cell.

use bempp_bbtree::{
    constants::DEFAULT_PADDING,
    geometry::BoundingBox,
    mesh::{CellType, StructuredMesh},
    search::compute_collisions_point,
    tools::{all_gather_boxes, generate_random_points, seeded_rng},
    tree::BoundingBoxTree,
};
use mpi::traits::Communicator;

pub fn main() {
    // Initialise MPI
    let universe = mpi::initialize().unwrap();

    // Get the world communicator
    let comm = universe.world();

    let rank = comm.rank() as usize;
    let size = comm.size() as usize;

    // Each rank meshes its own slab of the unit cube.
    let x0 = rank as f64 / size as f64;
    let x1 = (rank + 1) as f64 / size as f64;
    let mesh = StructuredMesh::create_box(
        [[x0, 0.0, 0.0], [x1, 1.0, 1.0]],
        [3, 6, 6],
        CellType::Tetrahedron,
    );

    let tree = BoundingBoxTree::new(&mesh, 3, None, DEFAULT_PADDING).unwrap();

    let global_tree = tree.create_global_tree(&comm);

    assert_eq!(global_tree.num_bboxes(), 2 * size - 1);
    assert_eq!(
        global_tree.root_bbox().unwrap().coordinates(),
        [0.0, 0.0, 0.0, 1.0, 1.0, 1.0]
    );

    // All ranks draw the same points.
    let mut rng = seeded_rng(0);
    let points = generate_random_points(
        100,
        &BoundingBox::new([-0.1, -0.1, -0.1, 1.1, 1.1, 1.1]),
        &mut rng,
    );

    for point in &points {
        let candidates = compute_collisions_point(&global_tree, point);
        if !compute_collisions_point(&tree, point).is_empty() {
            assert!(candidates.contains(&rank));
        }
        if !global_tree.root_bbox().unwrap().contains_point(point) {
            assert!(candidates.is_empty());
        }
    }

    // The global tree holds the gathered root boxes.
    let boxes = all_gather_boxes(tree.root_bbox().unwrap(), &comm);
    for (process, bbox) in global_tree.leaves() {
        assert_eq!(&boxes[process], bbox);
    }

    if rank == 0 {
        println!("Global tree is consistent with the local trees.");
    }
}

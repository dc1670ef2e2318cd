//! Find the closest exterior facet for random points around a cube.

use bempp_bbtree::{
    geometry::BoundingBox,
    mesh::{CellType, Mesh, StructuredMesh},
    search::{compute_closest_entity, squared_distance},
    tools::{generate_random_points, seeded_rng},
    tree::{create_midpoint_tree, BoundingBoxTree},
};
use itertools::Itertools;

pub fn main() {
    let mut mesh = StructuredMesh::unit_cube(4, 4, 4, CellType::Tetrahedron);

    let facets = mesh.exterior_facet_indices().unwrap();

    let tree = BoundingBoxTree::new(&mesh, 2, Some(&facets), 0.0).unwrap();
    let midpoint_tree = create_midpoint_tree(&mesh, 2, &facets).unwrap();

    // Initialise a seeded Rng.
    let mut rng = seeded_rng(2);

    let points = generate_random_points(
        200,
        &BoundingBox::new([-0.5, -0.5, -0.5, 1.5, 1.5, 1.5]),
        &mut rng,
    );

    let closest = compute_closest_entity(&tree, &midpoint_tree, &mesh, &points).unwrap();

    // Compare against a brute force search over all exterior facets.
    for (point, entity) in points.iter().zip(&closest) {
        let entity = entity.unwrap();
        let distances = squared_distance(&mesh, 2, &facets, &vec![*point; facets.len()]).unwrap();
        let best = distances.iter().copied().fold(f64::MAX, f64::min);
        let found = squared_distance(&mesh, 2, &[entity], &[*point]).unwrap()[0];
        assert!((found - best).abs() <= 1E-12 * (1.0 + best));
    }

    println!(
        "Found closest facets for {} points among {} exterior facets of {} cells.",
        points.len(),
        facets.len(),
        mesh.num_entities(3).unwrap().total()
    );
    println!(
        "Distinct closest facets: {}",
        closest.iter().flatten().unique().count()
    );
}

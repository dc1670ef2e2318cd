//! Collision and closest entity queries on bounding box trees.
//!
//! Queries against a tree only see the (possibly padded) boxes. To find out whether
//! the geometry itself collides, refine the candidates with [compute_colliding_cells],
//! which measures exact distances with GJK on the unpadded geometry.

use itertools::{izip, Itertools};
use tracing::debug;

use crate::{
    error::{BBTreeError, Result},
    geometry::{squared_distance as squared_point_distance, squared_norm, BoundingBox, Point},
    gjk::compute_distance_gjk,
    graph::AdjacencyList,
    mesh::{check_entities, checked_num_entities, Mesh},
    tree::{BoundingBoxTree, Node},
};

/// Entities whose leaf box contains `point`.
pub fn compute_collisions_point(tree: &BoundingBoxTree, point: &Point) -> Vec<usize> {
    let mut entities = Vec::new();
    if let Some(root) = tree.root() {
        collect_point_collisions(tree, point, root, &mut entities);
    }
    entities
}

fn collect_point_collisions(
    tree: &BoundingBoxTree,
    point: &Point,
    node: usize,
    entities: &mut Vec<usize>,
) {
    if !tree.bbox(node).contains_point(point) {
        return;
    }
    match tree.node(node) {
        Node::Leaf(entity) => entities.push(entity),
        Node::Internal([left, right]) => {
            collect_point_collisions(tree, point, left, entities);
            collect_point_collisions(tree, point, right, entities);
        }
    }
}

/// For each point, the entities whose leaf box contains the point.
///
/// Node `i` of the result holds the candidates of `points[i]`. For a global tree the
/// candidates are process ranks.
pub fn compute_collisions_points(tree: &BoundingBoxTree, points: &[Point]) -> AdjacencyList<usize> {
    AdjacencyList::from_nested(
        points
            .iter()
            .map(|point| compute_collisions_point(tree, point))
            .collect_vec(),
    )
}

/// The first entity found whose leaf box contains `point`.
pub fn compute_first_collision(tree: &BoundingBoxTree, point: &Point) -> Option<usize> {
    tree.root()
        .and_then(|root| first_point_collision(tree, point, root))
}

fn first_point_collision(tree: &BoundingBoxTree, point: &Point, node: usize) -> Option<usize> {
    if !tree.bbox(node).contains_point(point) {
        return None;
    }
    match tree.node(node) {
        Node::Leaf(entity) => Some(entity),
        Node::Internal([left, right]) => first_point_collision(tree, point, left)
            .or_else(|| first_point_collision(tree, point, right)),
    }
}

/// Pairs `[entity_a, entity_b]` of leaves in `tree_a` and `tree_b` whose boxes intersect.
///
/// Every intersecting pair is reported once. The pairs are sorted.
pub fn compute_collisions_trees(
    tree_a: &BoundingBoxTree,
    tree_b: &BoundingBoxTree,
) -> Vec<[usize; 2]> {
    let mut pairs = Vec::new();
    if let (Some(root_a), Some(root_b)) = (tree_a.root(), tree_b.root()) {
        collect_tree_collisions(tree_a, tree_b, root_a, root_b, &mut pairs);
    }
    pairs.sort_unstable();
    pairs
}

fn collect_tree_collisions(
    tree_a: &BoundingBoxTree,
    tree_b: &BoundingBoxTree,
    node_a: usize,
    node_b: usize,
    pairs: &mut Vec<[usize; 2]>,
) {
    let (bbox_a, bbox_b) = (tree_a.bbox(node_a), tree_b.bbox(node_b));
    if !bbox_a.intersects(bbox_b) {
        return;
    }

    match (tree_a.node(node_a), tree_b.node(node_b)) {
        (Node::Leaf(entity_a), Node::Leaf(entity_b)) => pairs.push([entity_a, entity_b]),
        (Node::Leaf(_), Node::Internal(children_b)) => {
            for child in children_b {
                collect_tree_collisions(tree_a, tree_b, node_a, child, pairs);
            }
        }
        (Node::Internal(children_a), Node::Leaf(_)) => {
            for child in children_a {
                collect_tree_collisions(tree_a, tree_b, child, node_b, pairs);
            }
        }
        (Node::Internal(children_a), Node::Internal(children_b)) => {
            // Descend into the larger box first.
            let diameter2 = |bbox: &BoundingBox| {
                squared_point_distance(&bbox.min(), &bbox.max())
            };
            if diameter2(bbox_a) >= diameter2(bbox_b) {
                for child in children_a {
                    collect_tree_collisions(tree_a, tree_b, child, node_b, pairs);
                }
            } else {
                for child in children_b {
                    collect_tree_collisions(tree_a, tree_b, node_a, child, pairs);
                }
            }
        }
    }
}

/// Squared distance between an entity's geometry and a point.
fn entity_distance2<M: Mesh>(mesh: &M, dim: usize, entity: usize, point: &Point) -> f64 {
    squared_norm(&compute_distance_gjk(
        &mesh.entity_coordinates(dim, entity),
        std::slice::from_ref(point),
    ))
}

/// Squared distances between `entities[i]` and `points[i]`, computed exactly with GJK.
pub fn squared_distance<M: Mesh>(
    mesh: &M,
    dim: usize,
    entities: &[usize],
    points: &[Point],
) -> Result<Vec<f64>> {
    if entities.len() != points.len() {
        return Err(BBTreeError::PointCountMismatch {
            expected: entities.len(),
            found: points.len(),
        });
    }
    let num_entities = checked_num_entities(mesh, dim)?;
    check_entities(entities, num_entities, dim)?;

    Ok(izip!(entities, points)
        .map(|(&entity, point)| entity_distance2(mesh, dim, entity, point))
        .collect_vec())
}

/// Refine bounding box candidates to the cells whose geometry is within `tolerance`
/// of the point.
///
/// `candidates` is typically the output of [compute_collisions_points] on a cell tree
/// for the same `points`. Padding of that tree does not matter here, distances are
/// always measured against the true cell geometry.
pub fn compute_colliding_cells<M: Mesh>(
    mesh: &M,
    candidates: &AdjacencyList<usize>,
    points: &[Point],
    tolerance: f64,
) -> Result<AdjacencyList<usize>> {
    if candidates.num_nodes() != points.len() {
        return Err(BBTreeError::PointCountMismatch {
            expected: candidates.num_nodes(),
            found: points.len(),
        });
    }

    let tdim = mesh.tdim();
    let num_cells = checked_num_entities(mesh, tdim)?;
    check_entities(candidates.array(), num_cells, tdim)?;

    let tolerance2 = tolerance * tolerance;

    Ok(AdjacencyList::from_nested(
        izip!(candidates.iter(), points)
            .map(|(cells, point)| {
                cells
                    .iter()
                    .copied()
                    .filter(|&cell| entity_distance2(mesh, tdim, cell, point) <= tolerance2)
                    .collect_vec()
            })
            .collect_vec(),
    ))
}

/// The first cell in `tree` whose geometry is within `tolerance` of `point`.
///
/// `tree` must be built over cells of `mesh`.
pub fn compute_first_colliding_cell<M: Mesh>(
    mesh: &M,
    tree: &BoundingBoxTree,
    point: &Point,
    tolerance: f64,
) -> Result<Option<usize>> {
    let tdim = mesh.tdim();
    if tree.tdim() != tdim {
        return Err(BBTreeError::InvalidDimension {
            dim: tree.tdim(),
            tdim,
        });
    }
    let num_cells = checked_num_entities(mesh, tdim)?;

    let candidates = compute_collisions_point(tree, point);
    check_entities(&candidates, num_cells, tdim)?;

    let tolerance2 = tolerance * tolerance;
    Ok(candidates
        .into_iter()
        .find(|&cell| entity_distance2(mesh, tdim, cell, point) <= tolerance2))
}

/// Current best candidate of a branch and bound search.
#[derive(Copy, Clone, Debug)]
struct Closest {
    entity: Option<usize>,
    distance2: f64,
}

// Branch and bound over `tree`. `leaf_distance2` gives the distance of the point to a
// leaf entity, which must not be smaller than the distance to the leaf box.
fn branch_and_bound<F: Fn(usize) -> f64>(
    tree: &BoundingBoxTree,
    point: &Point,
    node: usize,
    leaf_distance2: &F,
    best: &mut Closest,
) {
    match tree.node(node) {
        Node::Leaf(entity) => {
            let distance2 = leaf_distance2(entity);
            if best.entity.is_none() || distance2 < best.distance2 {
                *best = Closest {
                    entity: Some(entity),
                    distance2,
                };
            }
        }
        Node::Internal([left, right]) => {
            let left_distance2 = tree.bbox(left).squared_distance_to_point(point);
            let right_distance2 = tree.bbox(right).squared_distance_to_point(point);

            let ordered = if left_distance2 <= right_distance2 {
                [(left, left_distance2), (right, right_distance2)]
            } else {
                [(right, right_distance2), (left, left_distance2)]
            };

            for (child, bound) in ordered {
                if best.entity.is_none() || bound <= best.distance2 {
                    branch_and_bound(tree, point, child, leaf_distance2, best);
                }
            }
        }
    }
}

/// For each point, the entity of `tree` closest to it.
///
/// The search is seeded with the closest midpoint from `midpoint_tree`, which bounds
/// the distance from above, and then refined on `tree` with exact distances to the
/// entity geometry. Both trees must hold entities of the same dimension. When several
/// entities are equally close any of them may be returned. An empty `tree` gives
/// `None` for every point.
pub fn compute_closest_entity<M: Mesh>(
    tree: &BoundingBoxTree,
    midpoint_tree: &BoundingBoxTree,
    mesh: &M,
    points: &[Point],
) -> Result<Vec<Option<usize>>> {
    let dim = tree.tdim();
    let num_entities = checked_num_entities(mesh, dim)?;
    if midpoint_tree.tdim() != dim {
        return Err(BBTreeError::InvalidDimension {
            dim: midpoint_tree.tdim(),
            tdim: dim,
        });
    }

    let Some(root) = tree.root() else {
        debug!("Closest entity search on an empty tree.");
        return Ok(vec![None; points.len()]);
    };

    let leaf_entities = tree
        .leaves()
        .chain(midpoint_tree.leaves())
        .map(|(entity, _)| entity)
        .collect_vec();
    check_entities(&leaf_entities, num_entities, dim)?;

    Ok(points
        .iter()
        .map(|point| {
            let mut best = Closest {
                entity: None,
                distance2: f64::MAX,
            };

            if let Some(midpoint_root) = midpoint_tree.root() {
                let midpoint_distance2 =
                    |entity: usize| squared_point_distance(&mesh.entity_midpoint(dim, entity), point);
                branch_and_bound(midpoint_tree, point, midpoint_root, &midpoint_distance2, &mut best);
            }

            let exact_distance2 = |entity: usize| entity_distance2(mesh, dim, entity, point);
            branch_and_bound(tree, point, root, &exact_distance2, &mut best);

            best.entity
        })
        .collect_vec())
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use itertools::Itertools;
    use rand::Rng;

    use super::{
        compute_closest_entity, compute_colliding_cells, compute_collisions_point,
        compute_collisions_points, compute_collisions_trees, compute_first_colliding_cell,
        compute_first_collision, squared_distance,
    };
    use crate::{
        constants::DEFAULT_COLLISION_TOLERANCE,
        error::BBTreeError,
        geometry::{squared_norm, Point},
        gjk::compute_distance_gjk,
        mesh::{CellType, Mesh, StructuredMesh},
        tools::seeded_rng,
        tree::{create_midpoint_tree, BoundingBoxTree},
    };

    fn all_entities<M: Mesh>(mesh: &M, dim: usize) -> Vec<usize> {
        (0..mesh.num_entities(dim).unwrap().total()).collect_vec()
    }

    // Check the closest entity against the entities touching the known closest point.
    fn check_closest<M: Mesh>(mesh: &M, tree: &BoundingBoxTree, closest: usize, p_c: Point) {
        let candidates = compute_collisions_points(tree, &[p_c]);
        if tree.tdim() == mesh.tdim() {
            let cells =
                compute_colliding_cells(mesh, &candidates, &[p_c], DEFAULT_COLLISION_TOLERANCE)
                    .unwrap();
            assert!(cells.links(0).contains(&closest));
        } else {
            assert!(candidates.links(0).contains(&closest));
        }
    }

    #[test]
    fn test_empty_tree_queries() {
        let mesh = StructuredMesh::unit_interval(16);
        let tree = BoundingBoxTree::new(&mesh, 1, Some(&[]), 0.0).unwrap();
        let full = BoundingBoxTree::new(&mesh, 1, None, 0.0).unwrap();
        let point = [0.3, 0.0, 0.0];

        assert!(compute_collisions_point(&tree, &point).is_empty());
        assert!(compute_first_collision(&tree, &point).is_none());
        assert!(compute_collisions_trees(&tree, &full).is_empty());
        assert!(compute_collisions_trees(&full, &tree).is_empty());

        let midpoint_tree = create_midpoint_tree(&mesh, 1, &[]).unwrap();
        assert_eq!(
            compute_closest_entity(&tree, &midpoint_tree, &mesh, &[point]).unwrap(),
            vec![None]
        );
    }

    #[test]
    fn test_compute_collisions_point_1d() {
        let n = 16;
        let mesh = StructuredMesh::unit_interval(n);
        let tree = BoundingBoxTree::new(&mesh, 1, None, 0.0).unwrap();

        let point = [0.3, 0.0, 0.0];
        let entities = compute_collisions_point(&tree, &point);
        assert_eq!(entities.len(), 1);

        let vertices = mesh.entity_coordinates(1, entities[0]);
        assert_relative_eq!(vertices[0][0], 0.25);
        assert_relative_eq!(vertices[1][0], 0.3125);

        assert_eq!(compute_first_collision(&tree, &point), Some(entities[0]));
        assert_eq!(
            compute_first_colliding_cell(&mesh, &tree, &point, DEFAULT_COLLISION_TOLERANCE)
                .unwrap(),
            Some(entities[0])
        );

        // A point on a vertex collides with both neighbouring cells.
        let entities = compute_collisions_point(&tree, &[0.5, 0.0, 0.0]);
        assert_eq!(entities.iter().copied().sorted().collect_vec(), vec![7, 8]);
    }

    #[test]
    fn test_compute_collisions_tree_1d() {
        for shift in [0.52, 0.9] {
            let mesh_a = StructuredMesh::unit_interval(16);
            let mut mesh_b = StructuredMesh::unit_interval(16);
            mesh_b.translate([shift, 0.0, 0.0]);

            // Cells attached to the vertices inside the overlap.
            let expected_cells = |mesh: &StructuredMesh, vertices: Vec<usize>| {
                let vertex_to_cells = mesh.entity_to_cells(0).unwrap();
                vertices
                    .iter()
                    .flat_map(|&v| vertex_to_cells.links(v).to_vec())
                    .sorted()
                    .dedup()
                    .collect_vec()
            };
            let vertices_a = mesh_a.locate_entities(0, |x| x[0] >= shift).unwrap();
            let cells_a = expected_cells(&mesh_a, vertices_a);
            let vertices_b = mesh_b.locate_entities(0, |x| x[0] <= 1.0).unwrap();
            let cells_b = expected_cells(&mesh_b, vertices_b);

            let tree_a = BoundingBoxTree::new(&mesh_a, 1, None, 0.0).unwrap();
            let tree_b = BoundingBoxTree::new(&mesh_b, 1, None, 0.0).unwrap();
            let pairs = compute_collisions_trees(&tree_a, &tree_b);

            let entities_a = pairs.iter().map(|p| p[0]).sorted().dedup().collect_vec();
            let entities_b = pairs.iter().map(|p| p[1]).sorted().dedup().collect_vec();
            assert_eq!(entities_a, cells_a);
            assert_eq!(entities_b, cells_b);
        }
    }

    #[test]
    fn test_compute_collisions_tree_brute_force() {
        let cases = [
            (
                StructuredMesh::unit_square(3, 3, CellType::Triangle),
                StructuredMesh::unit_square(5, 5, CellType::Triangle),
                [0.52, 0.51, 0.0],
            ),
            (
                StructuredMesh::unit_square(3, 3, CellType::Triangle),
                StructuredMesh::unit_square(5, 5, CellType::Quadrilateral),
                [0.9, -0.9, 0.0],
            ),
            (
                StructuredMesh::unit_cube(2, 2, 2, CellType::Tetrahedron),
                StructuredMesh::unit_cube(2, 2, 2, CellType::Tetrahedron),
                [0.52, 0.51, 0.3],
            ),
            (
                StructuredMesh::unit_cube(2, 2, 2, CellType::Tetrahedron),
                StructuredMesh::unit_cube(2, 2, 2, CellType::Hexahedron),
                [0.9, -0.9, 0.3],
            ),
        ];

        for (mesh_a, mut mesh_b, shift) in cases {
            mesh_b.translate(shift);
            let tdim = mesh_a.tdim();
            let tree_a = BoundingBoxTree::new(&mesh_a, tdim, None, 0.0).unwrap();
            let tree_b = BoundingBoxTree::new(&mesh_b, tdim, None, 0.0).unwrap();

            let expected = tree_a
                .leaves()
                .cartesian_product(tree_b.leaves().collect_vec())
                .filter(|((_, a), (_, b))| a.intersects(b))
                .map(|((a, _), (b, _))| [a, b])
                .sorted()
                .collect_vec();

            let pairs = compute_collisions_trees(&tree_a, &tree_b);
            assert!(!pairs.is_empty());
            assert_eq!(pairs, expected);

            // Swapping the trees swaps the pairs.
            let swapped = compute_collisions_trees(&tree_b, &tree_a)
                .into_iter()
                .map(|[b, a]| [a, b])
                .sorted()
                .collect_vec();
            assert_eq!(swapped, pairs);
        }
    }

    #[test]
    fn test_padded_bbox() {
        let eps = 1E-12;
        let mesh_0 = StructuredMesh::create_box(
            [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0 - eps]],
            [1, 1, 2],
            CellType::Hexahedron,
        );
        let mesh_1 = StructuredMesh::create_box(
            [[0.0, 0.0, 1.0 + eps], [1.0, 1.0, 2.0]],
            [1, 1, 2],
            CellType::Hexahedron,
        );

        let tree_0 = BoundingBoxTree::new(&mesh_0, 3, None, eps).unwrap();
        let tree_1 = BoundingBoxTree::new(&mesh_1, 3, None, eps).unwrap();
        let pairs = compute_collisions_trees(&tree_0, &tree_1);
        assert_eq!(pairs.len(), 1);

        let [cell_0, cell_1] = pairs[0];
        let distance = compute_distance_gjk(
            &mesh_0.entity_coordinates(3, cell_0),
            &mesh_1.entity_coordinates(3, cell_1),
        );
        assert_relative_eq!(squared_norm(&distance).sqrt(), 2.0 * eps, max_relative = 1E-3);

        let tree_0 = BoundingBoxTree::new(&mesh_0, 3, None, 0.0).unwrap();
        let tree_1 = BoundingBoxTree::new(&mesh_1, 3, None, 0.0).unwrap();
        assert!(compute_collisions_trees(&tree_0, &tree_1).is_empty());
    }

    #[test]
    fn test_padding_does_not_create_exact_collisions() {
        let mesh = StructuredMesh::unit_square(4, 4, CellType::Triangle);
        let tree = BoundingBoxTree::new(&mesh, 2, None, 0.1).unwrap();

        let points = [[1.05, 0.5, 0.0], [0.3, 0.3, 0.0]];
        let candidates = compute_collisions_points(&tree, &points);
        assert!(candidates.num_links(0) > 0);

        let cells =
            compute_colliding_cells(&mesh, &candidates, &points, DEFAULT_COLLISION_TOLERANCE)
                .unwrap();
        assert_eq!(cells.num_links(0), 0);
        assert!(cells.num_links(1) > 0);
        assert!(compute_first_colliding_cell(&mesh, &tree, &points[0], 1E-10)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_colliding_cells_errors() {
        let mesh = StructuredMesh::unit_interval(4);
        let tree = BoundingBoxTree::new(&mesh, 1, None, 0.0).unwrap();
        let candidates = compute_collisions_points(&tree, &[[0.5, 0.0, 0.0]]);

        assert_eq!(
            compute_colliding_cells(&mesh, &candidates, &[], 1E-10).unwrap_err(),
            BBTreeError::PointCountMismatch {
                expected: 1,
                found: 0
            }
        );
        assert!(squared_distance(&mesh, 1, &[0, 1], &[[0.0; 3]]).is_err());
        assert!(squared_distance(&mesh, 1, &[4], &[[0.0; 3]]).is_err());
    }

    #[test]
    fn test_query_dimension_errors() {
        let mut mesh = StructuredMesh::unit_cube(2, 2, 2, CellType::Tetrahedron);
        let facets = mesh.exterior_facet_indices().unwrap();
        let facet_tree = BoundingBoxTree::new(&mesh, 2, Some(&facets), 0.0).unwrap();
        let point = [0.5, 0.5, 1.0];

        // A facet tree cannot be refined against cells.
        assert_eq!(
            compute_first_colliding_cell(&mesh, &facet_tree, &point, DEFAULT_COLLISION_TOLERANCE)
                .unwrap_err(),
            BBTreeError::InvalidDimension { dim: 2, tdim: 3 }
        );

        let cell_tree = BoundingBoxTree::new(&mesh, 3, None, 0.0).unwrap();
        assert!(
            compute_first_colliding_cell(&mesh, &cell_tree, &point, DEFAULT_COLLISION_TOLERANCE)
                .unwrap()
                .is_some()
        );

        // The midpoint tree must hold entities of the same dimension.
        let cell_midpoints = create_midpoint_tree(&mesh, 3, &[0, 1, 2]).unwrap();
        assert_eq!(
            compute_closest_entity(&facet_tree, &cell_midpoints, &mesh, &[point]).unwrap_err(),
            BBTreeError::InvalidDimension { dim: 3, tdim: 2 }
        );

        // The mesh passed to the query has no edges.
        let plain = StructuredMesh::unit_cube(2, 2, 2, CellType::Tetrahedron);
        let mut with_edges = plain.clone();
        with_edges.create_entities(1).unwrap();
        let edge_tree = BoundingBoxTree::new(&with_edges, 1, None, 0.0).unwrap();
        let edge_midpoints = create_midpoint_tree(&with_edges, 1, &[0]).unwrap();
        assert_eq!(
            compute_closest_entity(&edge_tree, &edge_midpoints, &plain, &[point]).unwrap_err(),
            BBTreeError::InvalidDimension { dim: 1, tdim: 3 }
        );
    }

    #[test]
    fn test_squared_distance() {
        let mesh = StructuredMesh::unit_square(2, 2, CellType::Quadrilateral);
        let distances =
            squared_distance(&mesh, 2, &[0, 3], &[[-1.0, 0.25, 0.0], [0.75, 0.75, 2.0]]).unwrap();
        assert_relative_eq!(distances[0], 1.0);
        assert_relative_eq!(distances[1], 4.0);
    }

    #[test]
    fn test_compute_closest_entity_1d() {
        let n = 16;
        let ref_distance = 0.75;
        let points = [
            [-ref_distance, 0.0, 0.0],
            [2.0 / n as f64, 2.0 * ref_distance, 0.0],
        ];
        let closest_points = [[0.0, 0.0, 0.0], [2.0 / n as f64, 0.0, 0.0]];
        let mesh = StructuredMesh::unit_interval(n);

        for dim in [0, 1] {
            let tree = BoundingBoxTree::new(&mesh, dim, None, 0.0).unwrap();
            let midpoint_tree = create_midpoint_tree(&mesh, dim, &all_entities(&mesh, dim)).unwrap();
            let closest = compute_closest_entity(&tree, &midpoint_tree, &mesh, &points).unwrap();

            for (entity, p_c) in closest.into_iter().zip(closest_points) {
                check_closest(&mesh, &tree, entity.unwrap(), p_c);
            }
        }
    }

    #[test]
    fn test_compute_closest_entity_2d() {
        let mut mesh = StructuredMesh::unit_square(15, 15, CellType::Triangle);
        mesh.create_entities(1).unwrap();
        let point = [-1.0, -0.01, 0.0];

        for dim in [0, 1, 2] {
            let tree = BoundingBoxTree::new(&mesh, dim, None, 0.0).unwrap();
            let midpoint_tree = create_midpoint_tree(&mesh, dim, &all_entities(&mesh, dim)).unwrap();
            let closest = compute_closest_entity(&tree, &midpoint_tree, &mesh, &[point]).unwrap();

            check_closest(&mesh, &tree, closest[0].unwrap(), [0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_compute_closest_entity_3d() {
        let mut mesh = StructuredMesh::unit_cube(8, 8, 8, CellType::Tetrahedron);
        let point = [0.9, 0.0, 1.135];

        for dim in [1, 2, 3] {
            mesh.create_entities(dim).unwrap();
            let tree = BoundingBoxTree::new(&mesh, dim, None, 0.0).unwrap();
            let midpoint_tree = create_midpoint_tree(&mesh, dim, &all_entities(&mesh, dim)).unwrap();
            let closest = compute_closest_entity(&tree, &midpoint_tree, &mesh, &[point]).unwrap();

            check_closest(&mesh, &tree, closest[0].unwrap(), [0.9, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_compute_closest_sub_entity() {
        let ref_distance = 0.31;
        let point = [0.5 + ref_distance, 0.5, 0.5];
        let mut mesh = StructuredMesh::unit_cube(8, 8, 8, CellType::Tetrahedron);

        for dim in [1, 2, 3] {
            mesh.create_entities(dim).unwrap();
            let left_entities = mesh.locate_entities(dim, |x| x[0] <= 0.5).unwrap();
            let tree = BoundingBoxTree::new(&mesh, dim, Some(&left_entities), 0.0).unwrap();
            let midpoint_tree = create_midpoint_tree(&mesh, dim, &left_entities).unwrap();
            let closest = compute_closest_entity(&tree, &midpoint_tree, &mesh, &[point]).unwrap();

            let closest = closest[0].unwrap();
            assert!(left_entities.contains(&closest));
            check_closest(&mesh, &tree, closest, [0.5, 0.5, 0.5]);
        }
    }

    #[test]
    fn test_closest_entity_matches_brute_force() {
        let mut rng = seeded_rng(0);
        let mut mesh = StructuredMesh::unit_square(4, 4, CellType::Triangle);
        mesh.create_entities(1).unwrap();

        let points = (0..50)
            .map(|_| [rng.gen_range(-0.5..1.5), rng.gen_range(-0.5..1.5), 0.0])
            .collect_vec();

        for dim in [0, 1, 2] {
            let entities = all_entities(&mesh, dim);
            let tree = BoundingBoxTree::new(&mesh, dim, None, 0.0).unwrap();
            let midpoint_tree = create_midpoint_tree(&mesh, dim, &entities).unwrap();
            let closest = compute_closest_entity(&tree, &midpoint_tree, &mesh, &points).unwrap();

            for (entity, point) in closest.into_iter().zip(&points) {
                let entity = entity.unwrap();
                let found = squared_distance(&mesh, dim, &[entity], &[*point]).unwrap()[0];
                let best = entities
                    .iter()
                    .map(|&e| squared_distance(&mesh, dim, &[e], &[*point]).unwrap()[0])
                    .fold(f64::MAX, f64::min);
                assert!(found <= best + 1E-12);
            }

            // Without a midpoint seed the search still finds the closest entity.
            let empty_midpoint_tree = create_midpoint_tree(&mesh, dim, &[]).unwrap();
            let unseeded = compute_closest_entity(&tree, &empty_midpoint_tree, &mesh, &points).unwrap();
            for (entity, point) in unseeded.into_iter().zip(&points) {
                let found = squared_distance(&mesh, dim, &[entity.unwrap()], &[*point]).unwrap()[0];
                let best = entities
                    .iter()
                    .map(|&e| squared_distance(&mesh, dim, &[e], &[*point]).unwrap()[0])
                    .fold(f64::MAX, f64::min);
                assert!(found <= best + 1E-12);
            }
        }
    }

    #[test]
    fn test_surface_bbtree() {
        let mut mesh = StructuredMesh::unit_cube(8, 8, 8, CellType::Tetrahedron);
        let facets = mesh.exterior_facet_indices().unwrap();
        let facet_to_cells = mesh.entity_to_cells(2).unwrap();
        let cells = facets
            .iter()
            .map(|&f| facet_to_cells.links(f)[0])
            .collect_vec();

        let tree = BoundingBoxTree::new(&mesh, 3, Some(&cells), 0.0).unwrap();
        assert!(compute_collisions_point(&tree, &[0.5, 0.5, 0.5]).is_empty());
    }

    #[test]
    fn test_surface_bbtree_collision() {
        let mut mesh_1 = StructuredMesh::unit_cube(3, 3, 3, CellType::Hexahedron);
        let mut mesh_2 = StructuredMesh::unit_cube(3, 3, 3, CellType::Hexahedron);
        mesh_2.translate([0.9, 0.9, 0.9]);

        let boundary_cells = |mesh: &mut StructuredMesh| {
            let facets = mesh.exterior_facet_indices().unwrap();
            let facet_to_cells = mesh.entity_to_cells(2).unwrap();
            facets
                .iter()
                .map(|&f| facet_to_cells.links(f)[0])
                .sorted()
                .dedup()
                .collect_vec()
        };
        let cells_1 = boundary_cells(&mut mesh_1);
        let cells_2 = boundary_cells(&mut mesh_2);
        assert_eq!(cells_1.len(), 26);

        let tree_1 = BoundingBoxTree::new(&mesh_1, 3, Some(&cells_1), 0.0).unwrap();
        let tree_2 = BoundingBoxTree::new(&mesh_2, 3, Some(&cells_2), 0.0).unwrap();

        assert_eq!(compute_collisions_trees(&tree_1, &tree_2).len(), 1);
    }
}

//! Bounding box trees over mesh entities.
//!
//! A tree is stored as a flat array of nodes. Leaves refer to one entity, internal
//! nodes to two children, always by index into the node array. Children are inserted
//! before their parent, so the root is the last node.
//!
//! A tree is a snapshot of the mesh geometry at construction time. Moving the mesh
//! afterwards leaves the tree stale; rebuild it after changing coordinates.

use itertools::{izip, Itertools};
use tracing::debug;

use crate::{
    error::{BBTreeError, Result},
    geometry::BoundingBox,
    mesh::{check_entities, checked_num_entities, Mesh},
};

/// A node of a [BoundingBoxTree].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A leaf with the index of its entity. For global trees this is a process rank.
    Leaf(usize),
    /// An internal node with the indices of its two children.
    Internal([usize; 2]),
}

/// A balanced binary tree of axis-aligned bounding boxes.
#[derive(Clone, Debug)]
pub struct BoundingBoxTree {
    nodes: Vec<Node>,
    bboxes: Vec<BoundingBox>,
    tdim: usize,
    padding: f64,
}

impl BoundingBoxTree {
    /// Build a tree over entities of dimension `tdim`.
    ///
    /// # Arguments
    /// - `mesh`: The mesh.
    /// - `tdim`: Topological dimension of the entities.
    /// - `entities`: The entities to put into the tree. `None` uses all owned and ghost
    ///   entities of dimension `tdim`, an empty slice gives an empty tree.
    /// - `padding`: Non-negative value by which every leaf box is enlarged in each
    ///   direction.
    ///
    /// The entities of dimension `tdim` must have been created on the mesh.
    pub fn new<M: Mesh>(
        mesh: &M,
        tdim: usize,
        entities: Option<&[usize]>,
        padding: f64,
    ) -> Result<Self> {
        if !padding.is_finite() || padding < 0.0 {
            return Err(BBTreeError::InvalidPadding(padding));
        }

        let num_entities = checked_num_entities(mesh, tdim)?;

        let entities = match entities {
            Some(entities) => {
                check_entities(entities, num_entities, tdim)?;
                entities.to_vec()
            }
            None => (0..num_entities).collect_vec(),
        };

        let x = mesh.coordinates();
        let leaves = izip!(&entities, mesh.entities_to_geometry(tdim, &entities))
            .map(|(&entity, nodes)| {
                let points = nodes.iter().map(|&node| x[node]).collect_vec();
                (entity, BoundingBox::from_points(&points).padded(padding))
            })
            .collect_vec();

        let tree = Self::from_leaves(leaves, tdim, padding);

        debug!(
            "Built bounding box tree of dimension {} over {} entities with {} boxes (padding {}).",
            tdim,
            entities.len(),
            tree.num_bboxes(),
            padding
        );

        Ok(tree)
    }

    /// Build a tree from leaf boxes. Each leaf is given as `(entity, box)`.
    pub fn from_leaves(mut leaves: Vec<(usize, BoundingBox)>, tdim: usize, padding: f64) -> Self {
        let num_bboxes = if leaves.is_empty() {
            0
        } else {
            2 * leaves.len() - 1
        };

        let mut tree = Self {
            nodes: Vec::with_capacity(num_bboxes),
            bboxes: Vec::with_capacity(num_bboxes),
            tdim,
            padding,
        };

        if !leaves.is_empty() {
            tree.build(&mut leaves);
        }

        debug_assert_eq!(tree.num_bboxes(), num_bboxes);

        tree
    }

    // Recursively split the leaves at the median center along the axis of largest
    // spread. Returns the index of the subtree root.
    fn build(&mut self, leaves: &mut [(usize, BoundingBox)]) -> usize {
        if let [(entity, bbox)] = &*leaves {
            return self.push(Node::Leaf(*entity), *bbox);
        }

        let centers = BoundingBox::from_points(
            &leaves.iter().map(|(_, bbox)| bbox.center()).collect_vec(),
        );
        let (lower, upper) = (centers.min(), centers.max());
        let axis = (0..3)
            .max_by(|&a, &b| (upper[a] - lower[a]).total_cmp(&(upper[b] - lower[b])))
            .unwrap_or(0);

        let mid = leaves.len() / 2;
        leaves.select_nth_unstable_by(mid, |(_, a), (_, b)| {
            a.center()[axis].total_cmp(&b.center()[axis])
        });

        let (left, right) = leaves.split_at_mut(mid);
        let left = self.build(left);
        let right = self.build(right);

        let bbox = self.bboxes[left].union(&self.bboxes[right]);
        self.push(Node::Internal([left, right]), bbox)
    }

    fn push(&mut self, node: Node, bbox: BoundingBox) -> usize {
        self.nodes.push(node);
        self.bboxes.push(bbox);
        self.nodes.len() - 1
    }

    /// Number of boxes (leaves and internal nodes).
    pub fn num_bboxes(&self) -> usize {
        self.bboxes.len()
    }

    /// Return true if the tree has no boxes.
    pub fn is_empty(&self) -> bool {
        self.bboxes.is_empty()
    }

    /// Topological dimension of the entities in the tree.
    pub fn tdim(&self) -> usize {
        self.tdim
    }

    /// Padding applied to the leaf boxes.
    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Box of node `index`.
    pub fn bbox(&self, index: usize) -> &BoundingBox {
        &self.bboxes[index]
    }

    /// Node `index`.
    pub fn node(&self, index: usize) -> Node {
        self.nodes[index]
    }

    /// Index of the root node, `None` for an empty tree.
    pub fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    /// Box of the root node, `None` for an empty tree.
    pub fn root_bbox(&self) -> Option<&BoundingBox> {
        self.bboxes.last()
    }

    /// Iterate over `(entity, box)` of all leaves.
    pub fn leaves(&self) -> impl Iterator<Item = (usize, &BoundingBox)> + '_ {
        self.nodes
            .iter()
            .zip(&self.bboxes)
            .filter_map(|(node, bbox)| match node {
                Node::Leaf(entity) => Some((*entity, bbox)),
                Node::Internal(_) => None,
            })
    }
}

impl std::fmt::Display for BoundingBoxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, (node, bbox)) in self.nodes.iter().zip(&self.bboxes).enumerate() {
            match node {
                Node::Leaf(entity) => writeln!(f, "{}: leaf {} {}", index, entity, bbox)?,
                Node::Internal([left, right]) => {
                    writeln!(f, "{}: children ({}, {}) {}", index, left, right, bbox)?
                }
            }
        }
        Ok(())
    }
}

/// The tight bounding box of the geometry nodes of an entity.
pub fn compute_bbox_of_entity<M: Mesh>(mesh: &M, dim: usize, entity: usize) -> BoundingBox {
    BoundingBox::from_points(&mesh.entity_coordinates(dim, entity))
}

/// Build a tree over the midpoints of the given entities.
///
/// Every leaf box is a single point. The tree serves as the candidate generator of
/// [crate::search::compute_closest_entity].
pub fn create_midpoint_tree<M: Mesh>(
    mesh: &M,
    tdim: usize,
    entities: &[usize],
) -> Result<BoundingBoxTree> {
    let num_entities = checked_num_entities(mesh, tdim)?;
    check_entities(entities, num_entities, tdim)?;

    let leaves = entities
        .iter()
        .map(|&entity| {
            (
                entity,
                BoundingBox::from_point(mesh.entity_midpoint(tdim, entity)),
            )
        })
        .collect_vec();

    Ok(BoundingBoxTree::from_leaves(leaves, tdim, 0.0))
}

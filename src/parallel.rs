//! Global trees over distributed meshes.
//!
//! Every process contributes the root box of its local tree. The global tree is
//! replicated on all processes and has one leaf per process, the leaf entity being
//! the process rank. A process with an empty local tree holds [BoundingBox::empty],
//! which never collides with anything. Queries against the global tree tell which
//! processes may hold a colliding entity.

use mpi::traits::CommunicatorCollectives;
use tracing::{debug, info};

use crate::{geometry::BoundingBox, tools::all_gather_boxes, tree::BoundingBoxTree};

impl BoundingBoxTree {
    /// Create the global tree of the local trees on all processes of `comm`.
    ///
    /// This is a collective operation. A process with an empty local tree contributes
    /// the empty box, so its leaf is never reported by a query.
    pub fn create_global_tree<C: CommunicatorCollectives>(&self, comm: &C) -> BoundingBoxTree {
        let local = self
            .root_bbox()
            .copied()
            .unwrap_or_else(BoundingBox::empty);

        let boxes = all_gather_boxes(&local, comm);

        let global_tree = Self::from_process_boxes(&boxes, self.tdim(), self.padding());

        if comm.rank() == 0 {
            info!(
                "Created global tree with {} of {} processes contributing.",
                boxes.iter().filter(|bbox| !bbox.is_empty()).count(),
                boxes.len()
            );
        }

        global_tree
    }

    /// Build a tree with one leaf per box, the leaf entity being the index of the box
    /// in `boxes`.
    ///
    /// The boxes are used as given, empty boxes included. `padding` only records the
    /// padding the boxes were built with.
    pub fn from_process_boxes(boxes: &[BoundingBox], tdim: usize, padding: f64) -> Self {
        debug!(
            "Building global tree over {} process boxes, {} of them empty.",
            boxes.len(),
            boxes.iter().filter(|bbox| bbox.is_empty()).count()
        );

        Self::from_leaves(boxes.iter().copied().enumerate().collect(), tdim, padding)
    }
}

//! Utility routines.

use mpi::traits::CommunicatorCollectives;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    constants::BOX_RECORD_SIZE,
    geometry::{BoundingBox, Point},
};

/// Gather one bounding box from every process to all processes.
///
/// Entry `r` of the result is the box contributed by rank `r`. Boxes travel as flat
/// records of six `f64` values, so the empty sentinel box is transmitted unchanged.
pub fn all_gather_boxes<C: CommunicatorCollectives>(bbox: &BoundingBox, comm: &C) -> Vec<BoundingBox> {
    let size = comm.size() as usize;

    let send = bbox.coordinates();
    let mut recv = vec![0.0; BOX_RECORD_SIZE * size];

    comm.all_gather_into(&send[..], &mut recv[..]);

    let records: &[[f64; BOX_RECORD_SIZE]] = bytemuck::cast_slice(&recv);

    records
        .iter()
        .map(|&record| BoundingBox::from_record(record))
        .collect()
}

/// Generate random points inside a bounding box.
///
/// Axes on which the box is flat produce the corresponding constant coordinate.
pub fn generate_random_points<R: Rng>(npoints: usize, bbox: &BoundingBox, rng: &mut R) -> Vec<Point> {
    let (lower, upper) = (bbox.min(), bbox.max());
    (0..npoints)
        .map(|_| {
            let mut point = lower;
            for axis in 0..3 {
                point[axis] += rng.gen::<f64>() * (upper[axis] - lower[axis]);
            }
            point
        })
        .collect()
}

/// Get a seeded rng
pub fn seeded_rng(seed: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed as u64)
}

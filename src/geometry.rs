//! Geometry information

use itertools::izip;

/// A point in three dimensions. Lower dimensional meshes set unused axes to zero.
pub type Point = [f64; 3];

/// Axis-aligned bounding box.
///
/// The coordinates are stored as `[xmin, ymin, zmin, xmax, ymax, zmax]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    coords: [f64; 6],
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// The coordinates are given by `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub fn new(coords: [f64; 6]) -> Self {
        debug_assert!(
            coords[0] <= coords[3] && coords[1] <= coords[4] && coords[2] <= coords[5],
            "Bounding box with min > max: {:?}",
            coords
        );
        Self { coords }
    }

    /// Create a bounding box from its lower and upper corner.
    pub fn from_min_max(min: Point, max: Point) -> Self {
        Self::new([min[0], min[1], min[2], max[0], max[1], max[2]])
    }

    /// A box that contains nothing and is neutral with respect to [BoundingBox::union].
    pub fn empty() -> Self {
        Self {
            coords: [f64::MAX, f64::MAX, f64::MAX, f64::MIN, f64::MIN, f64::MIN],
        }
    }

    /// Give a slice of points. Compute the tight bounding box of the points.
    ///
    /// An empty slice gives [BoundingBox::empty].
    pub fn from_points(points: &[Point]) -> BoundingBox {
        let mut coords = Self::empty().coords;

        for point in points {
            for axis in 0..3 {
                coords[axis] = f64::min(coords[axis], point[axis]);
                coords[3 + axis] = f64::max(coords[3 + axis], point[axis]);
            }
        }

        BoundingBox { coords }
    }

    /// Restore a box from a raw coordinate record, which may hold the empty sentinel.
    pub(crate) fn from_record(coords: [f64; 6]) -> Self {
        Self { coords }
    }

    /// Create a degenerate box consisting of a single point.
    pub fn from_point(point: Point) -> Self {
        Self::from_min_max(point, point)
    }

    /// Return coordinates
    pub fn coordinates(&self) -> [f64; 6] {
        self.coords
    }

    /// Lower corner.
    pub fn min(&self) -> Point {
        [self.coords[0], self.coords[1], self.coords[2]]
    }

    /// Upper corner.
    pub fn max(&self) -> Point {
        [self.coords[3], self.coords[4], self.coords[5]]
    }

    /// Return true if this box contains no point.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.coords[axis] > self.coords[3 + axis])
    }

    /// Return a copy of the box expanded by `padding` in every axis direction.
    pub fn padded(&self, padding: f64) -> Self {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;
        Self {
            coords: [
                xmin - padding,
                ymin - padding,
                zmin - padding,
                xmax + padding,
                ymax + padding,
                zmax + padding,
            ],
        }
    }

    /// The smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        let mut coords = self.coords;
        for axis in 0..3 {
            coords[axis] = f64::min(coords[axis], other.coords[axis]);
            coords[3 + axis] = f64::max(coords[3 + axis], other.coords[3 + axis]);
        }
        Self { coords }
    }

    /// Midpoint of the box.
    pub fn center(&self) -> Point {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;
        [
            0.5 * (xmin + xmax),
            0.5 * (ymin + ymax),
            0.5 * (zmin + zmax),
        ]
    }

    /// Check if a point lies inside the box. The boundary belongs to the box.
    pub fn contains_point(&self, point: &Point) -> bool {
        (0..3).all(|axis| self.coords[axis] <= point[axis] && point[axis] <= self.coords[3 + axis])
    }

    /// Check if `other` lies completely inside this box.
    pub fn contains_box(&self, other: &Self) -> bool {
        (0..3).all(|axis| {
            self.coords[axis] <= other.coords[axis]
                && other.coords[3 + axis] <= self.coords[3 + axis]
        })
    }

    /// Check if two boxes overlap. Touching boxes overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        (0..3).all(|axis| {
            self.coords[axis] <= other.coords[3 + axis]
                && other.coords[axis] <= self.coords[3 + axis]
        })
    }

    /// Squared distance from a point to the box. Zero if the point lies inside.
    pub fn squared_distance_to_point(&self, point: &Point) -> f64 {
        let mut dist2 = 0.0;
        for axis in 0..3 {
            let lower = self.coords[axis] - point[axis];
            let upper = point[axis] - self.coords[3 + axis];
            if lower > 0.0 {
                dist2 += lower * lower;
            } else if upper > 0.0 {
                dist2 += upper * upper;
            }
        }
        dist2
    }

    /// The eight corners of the box.
    ///
    /// Together they describe the box as a convex point set, which is what the GJK
    /// distance routine expects.
    pub fn corners(&self) -> [Point; 8] {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;
        [
            [xmin, ymin, zmin],
            [xmax, ymin, zmin],
            [xmin, ymax, zmin],
            [xmax, ymax, zmin],
            [xmin, ymin, zmax],
            [xmax, ymin, zmax],
            [xmin, ymax, zmax],
            [xmax, ymax, zmax],
        ]
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;

        write!(
            f,
            "(xmin: {}, ymin: {}, zmin: {}, xmax: {}, ymax: {}, zmax: {})",
            xmin, ymin, zmin, xmax, ymax, zmax
        )
    }
}

/// Difference `a - b` of two points.
pub fn sub(a: &Point, b: &Point) -> Point {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Dot product.
pub fn dot(a: &Point, b: &Point) -> f64 {
    izip!(a, b).map(|(x, y)| x * y).sum()
}

/// Squared Euclidean norm.
pub fn squared_norm(a: &Point) -> f64 {
    dot(a, a)
}

/// Squared distance between two points.
pub fn squared_distance(a: &Point, b: &Point) -> f64 {
    squared_norm(&sub(a, b))
}

/// Mean of a set of points. The midpoint of an empty set is the origin.
pub fn midpoint(points: &[Point]) -> Point {
    if points.is_empty() {
        return [0.0; 3];
    }
    let mut mean = [0.0; 3];
    for point in points {
        for (m, &x) in mean.iter_mut().zip(point) {
            *m += x;
        }
    }
    let scale = 1.0 / points.len() as f64;
    mean.map(|m| m * scale)
}

//! Distance between convex point sets.
//!
//! Implements the Gilbert-Johnson-Keerthi iteration on the Minkowski difference of two
//! convex hulls. The closest point of a simplex to the origin is found by checking all
//! sub-simplices (Johnson's distance sub-algorithm), which at most means 15 small
//! linear solves for a tetrahedron.

use itertools::Itertools;
use tracing::warn;

use crate::{
    constants::{GJK_EPSILON, GJK_MAX_ITERATIONS},
    geometry::{dot, squared_norm, sub, Point},
};

/// Compute the distance vector between the convex hulls of `p` and `q`.
///
/// The returned vector points from the closest point on `q` to the closest point on
/// `p`, its norm is the distance between the two hulls. If the hulls intersect or
/// touch the zero vector is returned.
///
/// Both point sets must be non-empty.
pub fn compute_distance_gjk(p: &[Point], q: &[Point]) -> Point {
    assert!(
        !p.is_empty() && !q.is_empty(),
        "GJK requires two non-empty point sets."
    );

    // Anything closer to the origin than a few ulps of the largest coordinate
    // counts as touching.
    let scale = p
        .iter()
        .chain(q)
        .flatten()
        .fold(1.0, |acc: f64, &c| acc.max(c.abs()));
    let zero_tolerance = 100.0 * f64::EPSILON * scale;
    let zero_tolerance2 = zero_tolerance * zero_tolerance;

    let mut v = sub(&p[0], &q[0]);
    let mut simplex = vec![v];

    for _ in 0..GJK_MAX_ITERATIONS {
        let vnorm2 = squared_norm(&v);
        if vnorm2 <= zero_tolerance2 {
            return [0.0; 3];
        }

        let w = sub(&support(p, &v.map(|x| -x)), &support(q, &v));

        // No new support point, the current estimate is optimal.
        if simplex.contains(&w) {
            return v;
        }

        if vnorm2 - dot(&v, &w) <= GJK_EPSILON * vnorm2 {
            return v;
        }

        simplex.push(w);
        (v, simplex) = nearest_simplex(&simplex);
    }

    warn!(
        "GJK did not converge within {} iterations, distance estimate {}",
        GJK_MAX_ITERATIONS,
        squared_norm(&v).sqrt()
    );

    v
}

/// Support point of a point set, i.e. the point with maximum extent along `direction`.
fn support(points: &[Point], direction: &Point) -> Point {
    let mut best = points[0];
    let mut best_value = dot(&best, direction);
    for point in &points[1..] {
        let value = dot(point, direction);
        if value > best_value {
            best_value = value;
            best = *point;
        }
    }
    best
}

/// Find the point of the simplex closest to the origin.
///
/// Returns the point and the smallest sub-simplex that contains it.
fn nearest_simplex(simplex: &[Point]) -> (Point, Vec<Point>) {
    debug_assert!(!simplex.is_empty() && simplex.len() <= 4);

    let nvertices = simplex.len();

    // Visit subsets by increasing size so that ties are resolved by the smallest face.
    let subsets = (1..(1_usize << nvertices)).sorted_by_key(|mask| mask.count_ones());

    let mut best: Option<(f64, Point, usize)> = None;

    for mask in subsets {
        let face = (0..nvertices)
            .filter(|index| mask & (1 << index) != 0)
            .map(|index| simplex[index])
            .collect_vec();

        if let Some(point) = project_origin(&face) {
            let dist2 = squared_norm(&point);
            if best.map_or(true, |(best_dist2, _, _)| dist2 < best_dist2) {
                best = Some((dist2, point, mask));
            }
        }
    }

    // A single vertex is always a valid face, so the search cannot come up empty.
    let (_, point, mask) = best.unwrap_or((squared_norm(&simplex[0]), simplex[0], 1));

    let reduced = (0..nvertices)
        .filter(|index| mask & (1 << index) != 0)
        .map(|index| simplex[index])
        .collect_vec();

    (point, reduced)
}

/// Project the origin onto the affine hull of `face`.
///
/// Returns `None` if the face is degenerate or if the projection lies outside the face.
fn project_origin(face: &[Point]) -> Option<Point> {
    let y0 = face[0];
    let k = face.len() - 1;

    if k == 0 {
        return Some(y0);
    }

    let edges = face[1..].iter().map(|y| sub(y, &y0)).collect_vec();

    // Normal equations for min |y0 + sum_i lambda_i e_i|^2.
    let mut matrix = [[0.0; 3]; 3];
    let mut rhs = [0.0; 3];
    for i in 0..k {
        for j in 0..k {
            matrix[i][j] = dot(&edges[i], &edges[j]);
        }
        rhs[i] = -dot(&y0, &edges[i]);
    }

    let lambda = solve(&mut matrix, &mut rhs, k)?;

    let lambda0 = 1.0 - lambda[..k].iter().sum::<f64>();
    if lambda0 < 0.0 || lambda[..k].iter().any(|&l| l < 0.0) {
        return None;
    }

    let mut point = y0;
    for (edge, &l) in edges.iter().zip(&lambda[..k]) {
        for axis in 0..3 {
            point[axis] += l * edge[axis];
        }
    }

    Some(point)
}

/// Solve the leading `n x n` block of a small linear system with partial pivoting.
///
/// Returns `None` if the system is numerically singular.
fn solve(matrix: &mut [[f64; 3]; 3], rhs: &mut [f64; 3], n: usize) -> Option<[f64; 3]> {
    let scale = (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .fold(0.0, |acc: f64, (i, j)| acc.max(matrix[i][j].abs()));

    if scale == 0.0 {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);

        if matrix[pivot_row][col].abs() <= 1E-13 * scale {
            return None;
        }

        matrix.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            for j in col..n {
                matrix[row][j] -= factor * matrix[col][j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = [0.0; 3];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|j| matrix[row][j] * solution[j]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }

    Some(solution)
}

//! Normalised direct linear transform.
//!
//! Each correspondence contributes two rows to a `2n x 9` system `A h = 0`;
//! points are first conditioned (centroid to origin, mean distance sqrt(2))
//! and the solution is the eigenvector of `A^T A` with the smallest
//! eigenvalue, de-normalised afterwards.

use crate::homography::Homography;
use crate::matching::PointPair;
use crate::util::{PanoError, PanoResult};
use nalgebra::{DMatrix, Matrix3, SymmetricEigen};

const MIN_SPREAD: f64 = 1e-12;

/// Conditioning transform and the conditioned points.
fn normalize_points<I>(pts: I, n: usize) -> PanoResult<(Matrix3<f64>, Vec<[f64; 2]>)>
where
    I: Iterator<Item = [f64; 2]> + Clone,
{
    let inv_n = 1.0 / n as f64;
    let (sx, sy) = pts
        .clone()
        .fold((0.0, 0.0), |(ax, ay), p| (ax + p[0], ay + p[1]));
    let (cx, cy) = (sx * inv_n, sy * inv_n);
    let mean_dist = pts
        .clone()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        * inv_n;
    if !(mean_dist > MIN_SPREAD) {
        return Err(PanoError::InvalidInput("degenerate point configuration"));
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();
    Ok((t, normalized))
}

/// Fits the homography mapping `src` to `dst` over all given pairs.
///
/// Exactly four pairs give the minimal solution; more pairs give the
/// algebraic least-squares fit. Fewer than four pairs are rejected with
/// [`PanoError::InsufficientCorrespondences`].
pub fn fit_dlt(pairs: &[PointPair]) -> PanoResult<Homography> {
    let n = pairs.len();
    if n < 4 {
        return Err(PanoError::InsufficientCorrespondences { needed: 4, got: n });
    }

    let (t_src, src) = normalize_points(pairs.iter().map(|p| p.src), n)?;
    let (t_dst, dst) = normalize_points(pairs.iter().map(|p| p.dst), n)?;

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for (i, (s, d)) in src.iter().zip(&dst).enumerate() {
        let (sx, sy) = (s[0], s[1]);
        let (dx, dy) = (d[0], d[1]);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 3)] = -sx;
        a[(r0, 4)] = -sy;
        a[(r0, 5)] = -1.0;
        a[(r0, 6)] = dy * sx;
        a[(r0, 7)] = dy * sy;
        a[(r0, 8)] = dy;

        a[(r1, 0)] = sx;
        a[(r1, 1)] = sy;
        a[(r1, 2)] = 1.0;
        a[(r1, 6)] = -dx * sx;
        a[(r1, 7)] = -dx * sy;
        a[(r1, 8)] = -dx;
    }

    let ata = a.transpose() * &a;
    let eig = SymmetricEigen::new(ata);
    let mut min_idx = 0;
    for i in 1..9 {
        if eig.eigenvalues[i].abs() < eig.eigenvalues[min_idx].abs() {
            min_idx = i;
        }
    }
    let h = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse().ok_or(PanoError::NoHomographyFound)?;
    let m = t_dst_inv * h_norm * t_src;
    if !m.iter().all(|v| v.is_finite()) || m.determinant().abs() < 1e-12 {
        return Err(PanoError::NoHomographyFound);
    }
    Ok(Homography::from_matrix(m))
}

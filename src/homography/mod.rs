//! Planar projective transforms and their robust estimation.
//!
//! A [`Homography`] maps pixel coordinates of one image into another image's
//! frame: `[u, v, w]^T = H [x, y, 1]^T`, `(u / w, v / w)`. Matrices are kept
//! normalised so that `H[2,2] == 1` whenever that element is not (numerically)
//! zero, which makes stored and composed transforms directly comparable.
//!
//! Composition follows matrix order: `a.compose(&b)` applies `b` first, then
//! `a`. The compositor relies on this when chaining transforms outward from
//! the anchor image.

mod dlt;
mod ransac;

pub use dlt::fit_dlt;
pub use ransac::{
    estimate_homography, estimate_homography_with_rng, CancelToken, HomographyFit, RansacConfig,
};

use crate::matching::PointPair;
use nalgebra::{Matrix3, Vector3};

const NORMALIZE_EPS: f64 = 1e-12;

/// 3x3 projective transform in normalised form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    /// A pure translation by `(tx, ty)`.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            m: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
        }
    }

    /// Wraps a matrix, normalising it by its bottom-right element.
    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        let scale = m[(2, 2)];
        if scale.abs() > NORMALIZE_EPS && scale.is_finite() {
            Self { m: m / scale }
        } else {
            Self { m }
        }
    }

    /// Builds a homography from nine row-major values.
    pub fn from_row_slice(values: &[f64; 9]) -> Self {
        Self::from_matrix(Matrix3::from_row_slice(values))
    }

    /// Returns the normalised matrix.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    /// Returns `self ∘ rhs`: the transform that applies `rhs`, then `self`.
    pub fn compose(&self, rhs: &Homography) -> Homography {
        Self::from_matrix(self.m * rhs.m)
    }

    /// Returns the inverse transform, or `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Homography> {
        self.m.try_inverse().map(Self::from_matrix)
    }

    /// Maps `(x, y)`; returns `None` for points sent to infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let p = self.m * Vector3::new(x, y, 1.0);
        if p[2].abs() < 1e-15 {
            return None;
        }
        let out = [p[0] / p[2], p[1] / p[2]];
        (out[0].is_finite() && out[1].is_finite()).then_some(out)
    }

    /// Forward reprojection error `||H src - dst||` in pixels.
    ///
    /// Points mapped to infinity report `f64::INFINITY`.
    pub fn reprojection_error(&self, pair: &PointPair) -> f64 {
        match self.apply(pair.src[0], pair.src[1]) {
            Some([u, v]) => {
                let du = u - pair.dst[0];
                let dv = v - pair.dst[1];
                (du * du + dv * dv).sqrt()
            }
            None => f64::INFINITY,
        }
    }

    /// Returns true if the translation part is an exact integer shift with no
    /// other terms, so warping reduces to a pixel copy.
    pub fn is_integer_translation(&self) -> bool {
        let m = &self.m;
        m[(0, 0)] == 1.0
            && m[(0, 1)] == 0.0
            && m[(1, 0)] == 0.0
            && m[(1, 1)] == 1.0
            && m[(2, 0)] == 0.0
            && m[(2, 1)] == 0.0
            && m[(2, 2)] == 1.0
            && m[(0, 2)].fract() == 0.0
            && m[(1, 2)].fract() == 0.0
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::Homography;
    use crate::matching::PointPair;

    fn sample() -> Homography {
        Homography::from_row_slice(&[1.1, 0.05, 12.0, -0.03, 0.95, -7.0, 1e-4, -2e-4, 1.0])
    }

    #[test]
    fn from_matrix_normalizes_scale() {
        let h = Homography::from_row_slice(&[2.0, 0.0, 4.0, 0.0, 2.0, 6.0, 0.0, 0.0, 2.0]);
        assert_eq!(h, Homography::translation(2.0, 3.0));
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = sample();
        let inv = h.inverse().unwrap();
        let identity = inv.compose(&h);
        for &(x, y) in &[(0.0, 0.0), (50.0, 75.0), (-30.0, 210.0)] {
            let p = identity.apply(x, y).unwrap();
            assert!((p[0] - x).abs() < 1e-9 && (p[1] - y).abs() < 1e-9);
        }
        let diff = identity.matrix() - nalgebra::Matrix3::identity();
        assert!(diff.amax() < 1e-12);
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let t = Homography::translation(10.0, 0.0);
        let s = Homography::from_row_slice(&[2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(t.compose(&s).apply(1.0, 1.0), Some([12.0, 2.0]));
        assert_eq!(s.compose(&t).apply(1.0, 1.0), Some([22.0, 2.0]));
    }

    #[test]
    fn reprojection_error_measures_pixels() {
        let h = Homography::translation(3.0, 4.0);
        let pair = PointPair {
            src: [0.0, 0.0],
            dst: [0.0, 0.0],
        };
        assert!((h.reprojection_error(&pair) - 5.0).abs() < 1e-12);
        assert!(h.is_integer_translation());
        assert!(!Homography::translation(0.5, 0.0).is_integer_translation());
    }
}

//! Small geometric helpers shared by the estimator and the compositor.

/// Returns twice the signed area of the triangle `(p0, p1, p2)`.
pub(crate) fn signed_area2(p0: [f64; 2], p1: [f64; 2], p2: [f64; 2]) -> f64 {
    (p1[0] - p0[0]) * (p2[1] - p0[1]) - (p1[1] - p0[1]) * (p2[0] - p0[0])
}

/// Returns true if any three of the four points are (nearly) collinear.
///
/// `tol` is compared against the triangle area in squared pixels.
pub(crate) fn any_three_collinear(pts: [[f64; 2]; 4], tol: f64) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES
        .iter()
        .any(|&(a, b, c)| 0.5 * signed_area2(pts[a], pts[b], pts[c]).abs() < tol)
}

/// Rounds a float coordinate down and clamps it into `[0, max]`.
pub(crate) fn floor_clamp(value: f64, max: usize) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value.floor() as usize).min(max)
}

/// Rounds a float coordinate up and clamps it into `[0, max]`.
pub(crate) fn ceil_clamp(value: f64, max: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value.is_infinite() {
        return max;
    }
    (value.ceil() as usize).min(max)
}

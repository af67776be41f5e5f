//! Normalised intensity-patch descriptors.

use crate::image::ImageView;

/// Fills `out` with the zero-mean, unit-norm patch of side `2 * radius + 1`
/// centered at `(cx, cy)`.
///
/// Returns `false` (leaving `out` cleared) when the patch leaves the image or
/// has no intensity variation. Unit norm bounds pairwise Euclidean distances
/// to `[0, 2]` and makes them insensitive to global gain and offset.
pub fn patch_descriptor(
    image: ImageView<'_, u8>,
    cx: usize,
    cy: usize,
    radius: usize,
    out: &mut Vec<f32>,
) -> bool {
    out.clear();
    if cx < radius
        || cy < radius
        || cx + radius >= image.width()
        || cy + radius >= image.height()
    {
        return false;
    }

    let side = 2 * radius + 1;
    let mut sum = 0.0f64;
    for y in (cy - radius)..=(cy + radius) {
        let Some(row) = image.row(y) else {
            out.clear();
            return false;
        };
        for &value in &row[cx - radius..cx - radius + side] {
            sum += value as f64;
            out.push(value as f32);
        }
    }

    let mean = (sum / out.len() as f64) as f32;
    let mut norm_sq = 0.0f64;
    for value in out.iter_mut() {
        *value -= mean;
        norm_sq += (*value as f64) * (*value as f64);
    }
    if norm_sq <= 1e-8 {
        out.clear();
        return false;
    }

    let inv_norm = (1.0 / norm_sq.sqrt()) as f32;
    for value in out.iter_mut() {
        *value *= inv_norm;
    }
    true
}

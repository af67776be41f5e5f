//! Perspective warping with transparent borders.
//!
//! Each canvas pixel inside the footprint of the warped source is mapped back
//! through the inverse homography and sampled bilinearly. Pixels whose
//! pre-image falls outside the source keep their current value, so later
//! images simply overwrite earlier ones where they overlap.

use crate::homography::Homography;
use crate::image::{ImageView, OwnedImage};
use crate::trace::{trace_event, trace_span};
use crate::util::math::{ceil_clamp, floor_clamp};
use crate::util::{PanoError, PanoResult};

/// Canvas rectangle `[x0, x1) x [y0, y1)` touched by a warp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Footprint {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

/// Warps `src` through `h` onto `canvas`, overwriting covered pixels.
///
/// Returns the number of canvas pixels written.
pub fn warp_perspective_transparent(
    canvas: &mut OwnedImage,
    src: ImageView<'_, u8>,
    h: &Homography,
) -> PanoResult<usize> {
    warp_with_offset(canvas, src, h, [0, 0])
}

/// Same as [`warp_perspective_transparent`], with the canvas origin shifted:
/// canvas pixel `(X, Y)` corresponds to `(X - offset[0], Y - offset[1])` in
/// the frame `h` maps into.
///
/// Keeping the integer offset out of `h` means the sampled values do not
/// depend on where the frame sits on the canvas.
pub(crate) fn warp_with_offset(
    canvas: &mut OwnedImage,
    src: ImageView<'_, u8>,
    h: &Homography,
    offset: [i64; 2],
) -> PanoResult<usize> {
    let _span = trace_span!("warp", width = src.width(), height = src.height()).entered();

    let inv = h
        .inverse()
        .ok_or(PanoError::InvalidInput("homography is not invertible"))?;
    let Some(fp) = footprint(h, src.width(), src.height(), canvas, offset) else {
        return Ok(0);
    };

    let width = canvas.width();
    let data = canvas.data_mut();
    let mut written = 0usize;
    for y in fp.y0..fp.y1 {
        let fy = (y as i64 - offset[1]) as f64;
        let row = &mut data[y * width..(y + 1) * width];
        for x in fp.x0..fp.x1 {
            let fx = (x as i64 - offset[0]) as f64;
            let Some([sx, sy]) = inv.apply(fx, fy) else {
                continue;
            };
            if let Some(value) = src.sample_bilinear(sx, sy) {
                row[x] = value.round().clamp(0.0, 255.0) as u8;
                written += 1;
            }
        }
    }

    trace_event!("warp_written", pixels = written);
    Ok(written)
}

/// Bounding box of the warped source corners on the canvas, or the whole
/// canvas if a corner maps to infinity. `None` if the box misses the canvas.
fn footprint(
    h: &Homography,
    src_w: usize,
    src_h: usize,
    canvas: &OwnedImage,
    offset: [i64; 2],
) -> Option<Footprint> {
    let (cw, ch) = (canvas.width(), canvas.height());
    let full = Footprint {
        x0: 0,
        y0: 0,
        x1: cw,
        y1: ch,
    };

    let Some((min, max)) = warped_bounds(h, src_w, src_h) else {
        return Some(full);
    };
    let min_x = min[0] + offset[0] as f64;
    let min_y = min[1] + offset[1] as f64;
    let max_x = max[0] + offset[0] as f64;
    let max_y = max[1] + offset[1] as f64;
    if max_x < 0.0 || max_y < 0.0 || min_x > (cw - 1) as f64 || min_y > (ch - 1) as f64 {
        return None;
    }

    Some(Footprint {
        x0: floor_clamp(min_x, cw - 1),
        y0: floor_clamp(min_y, ch - 1),
        x1: ceil_clamp(max_x, cw - 1) + 1,
        y1: ceil_clamp(max_y, ch - 1) + 1,
    })
}

/// Axis-aligned bounds `(min, max)` of the four source corners mapped by `h`.
///
/// Corners are taken at pixel centers `0` and `size - 1`, the extent that
/// bilinear sampling covers. Returns `None` if any corner maps to infinity.
pub(crate) fn warped_bounds(
    h: &Homography,
    src_w: usize,
    src_h: usize,
) -> Option<([f64; 2], [f64; 2])> {
    let xr = src_w.saturating_sub(1) as f64;
    let yb = src_h.saturating_sub(1) as f64;
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for (x, y) in [(0.0, 0.0), (xr, 0.0), (xr, yb), (0.0, yb)] {
        let [u, v] = h.apply(x, y)?;
        min[0] = min[0].min(u);
        min[1] = min[1].min(v);
        max[0] = max[0].max(u);
        max[1] = max[1].max(v);
    }
    Some((min, max))
}

//! Match visualisation (feature `image-io`).
//!
//! Renders two grayscale images side by side and connects matched keypoints
//! with coloured line segments.

use crate::features::FeatureSet;
use crate::image::ImageView;
use crate::matching::{best_n, Correspondence};
use crate::util::{PanoError, PanoResult};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_line_segment_mut};

/// Draws the first `n` of `matches` between image `a` (left) and image `b`
/// (right).
///
/// Correspondences referring to missing keypoints are rejected.
pub fn draw_matches(
    a: ImageView<'_, u8>,
    fa: &FeatureSet,
    b: ImageView<'_, u8>,
    fb: &FeatureSet,
    matches: &[Correspondence],
    n: usize,
) -> PanoResult<RgbImage> {
    let width = a.width() + b.width();
    let height = a.height().max(b.height());
    let too_big = PanoError::InvalidDimensions { width, height };
    let cw = u32::try_from(width).map_err(|_| too_big.clone())?;
    let ch = u32::try_from(height).map_err(|_| too_big)?;

    let mut canvas = RgbImage::new(cw, ch);
    blit_gray(&mut canvas, a, 0);
    blit_gray(&mut canvas, b, a.width() as u32);

    let shift = a.width() as f32;
    for (i, m) in best_n(matches, n).iter().enumerate() {
        let pa = fa.keypoint(m.query_idx).ok_or(PanoError::IndexOutOfBounds {
            index: m.query_idx,
            len: fa.len(),
            context: "query keypoint",
        })?;
        let pb = fb.keypoint(m.train_idx).ok_or(PanoError::IndexOutOfBounds {
            index: m.train_idx,
            len: fb.len(),
            context: "train keypoint",
        })?;
        let color = wheel_color(i);
        let start = (pa.x, pa.y);
        let end = (pb.x + shift, pb.y);
        draw_line_segment_mut(&mut canvas, start, end, color);
        draw_cross_mut(&mut canvas, color, start.0.round() as i32, start.1.round() as i32);
        draw_cross_mut(&mut canvas, color, end.0.round() as i32, end.1.round() as i32);
    }
    Ok(canvas)
}

fn blit_gray(canvas: &mut RgbImage, src: ImageView<'_, u8>, x_offset: u32) {
    for y in 0..src.height() {
        let Some(row) = src.row(y) else {
            continue;
        };
        for (x, &v) in row.iter().enumerate() {
            canvas.put_pixel(x as u32 + x_offset, y as u32, Rgb([v, v, v]));
        }
    }
}

/// Fully saturated colour rotating around the hue circle.
fn wheel_color(index: usize) -> Rgb<u8> {
    let hue = (index as f32 * 37.0) % 360.0;
    let sector = hue / 60.0;
    let ramp = 1.0 - (sector % 2.0 - 1.0).abs();
    let (r, g, b) = match sector as u32 {
        0 => (1.0, ramp, 0.0),
        1 => (ramp, 1.0, 0.0),
        2 => (0.0, 1.0, ramp),
        3 => (0.0, ramp, 1.0),
        4 => (ramp, 0.0, 1.0),
        _ => (1.0, 0.0, ramp),
    };
    Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
}

#[cfg(test)]
mod tests {
    use super::{draw_matches, wheel_color};
    use crate::features::{FeatureSet, Keypoint};
    use crate::image::OwnedImage;
    use crate::matching::Correspondence;
    use image::Rgb;

    fn single(x: f32, y: f32) -> FeatureSet {
        let mut set = FeatureSet::new(1);
        set.push(
            Keypoint {
                x,
                y,
                response: 1.0,
                size: 1.0,
            },
            &[0.0],
        )
        .unwrap();
        set
    }

    #[test]
    fn side_by_side_with_line() {
        let a = OwnedImage::new(vec![10u8; 8 * 6], 8, 6).unwrap();
        let b = OwnedImage::new(vec![20u8; 5 * 9], 5, 9).unwrap();
        let m = [Correspondence {
            query_idx: 0,
            train_idx: 0,
            distance: 0.0,
        }];
        let out = draw_matches(a.view(), &single(2.0, 3.0), b.view(), &single(1.0, 3.0), &m, 10)
            .unwrap();
        assert_eq!(out.dimensions(), (13, 9));
        assert_eq!(*out.get_pixel(0, 0), Rgb([10, 10, 10]));
        assert_eq!(*out.get_pixel(12, 8), Rgb([20, 20, 20]));
        assert_eq!(*out.get_pixel(0, 8), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(5, 3), wheel_color(0));
    }

    #[test]
    fn missing_keypoint_rejected() {
        let a = OwnedImage::zeros(4, 4).unwrap();
        let m = [Correspondence {
            query_idx: 3,
            train_idx: 0,
            distance: 0.0,
        }];
        assert!(draw_matches(a.view(), &single(0.0, 0.0), a.view(), &single(0.0, 0.0), &m, 1)
            .is_err());
    }
}

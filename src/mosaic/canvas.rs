//! Canvas sizing and anchor placement.

use crate::homography::Homography;
use crate::image::OwnedImage;
use crate::mosaic::warp::warped_bounds;
use crate::util::{PanoError, PanoResult};

/// How the mosaic canvas is sized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CanvasSizing {
    /// Sum of all widths by sum of all heights, at least twice the anchor's
    /// size, with the anchor centred. Generous; needs no transforms up front.
    #[default]
    Sum,
    /// Bounding box of every warped image. All transforms are computed before
    /// the canvas is allocated.
    Tight,
}

/// Canvas dimensions plus the integer position of the anchor's origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CanvasLayout {
    pub width: usize,
    pub height: usize,
    pub offset: [i64; 2],
}

impl CanvasLayout {
    pub(crate) fn area(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }
}

/// Summed layout; the anchor sits at `(cw / 2 - w / 2, ch / 2 - h / 2)`.
pub(crate) fn sum_layout(images: &[OwnedImage], anchor: usize) -> PanoResult<CanvasLayout> {
    let anchor_img = images.get(anchor).ok_or(PanoError::IndexOutOfBounds {
        index: anchor,
        len: images.len(),
        context: "anchor",
    })?;
    let (aw, ah) = (anchor_img.width(), anchor_img.height());
    let sum_w = images.iter().map(OwnedImage::width).sum::<usize>();
    let sum_h = images.iter().map(OwnedImage::height).sum::<usize>();
    let width = sum_w.max(2 * aw);
    let height = sum_h.max(2 * ah);

    Ok(CanvasLayout {
        width,
        height,
        offset: [(width / 2 - aw / 2) as i64, (height / 2 - ah / 2) as i64],
    })
}

/// Tight layout from the transforms mapping every image into the anchor frame.
pub(crate) fn tight_layout(
    images: &[OwnedImage],
    transforms: &[Homography],
) -> PanoResult<CanvasLayout> {
    if images.is_empty() || images.len() != transforms.len() {
        return Err(PanoError::InvalidInput("one transform per image required"));
    }

    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for (img, h) in images.iter().zip(transforms) {
        let (lo, hi) = warped_bounds(h, img.width(), img.height())
            .ok_or(PanoError::InvalidInput("warped image extends to infinity"))?;
        for axis in 0..2 {
            min[axis] = min[axis].min(lo[axis]);
            max[axis] = max[axis].max(hi[axis]);
        }
    }

    let lo = [min[0].floor(), min[1].floor()];
    let hi = [max[0].ceil(), max[1].ceil()];
    let span = [hi[0] - lo[0] + 1.0, hi[1] - lo[1] + 1.0];
    if !(span[0].is_finite() && span[1].is_finite()) || span[0] > usize::MAX as f64 / 2.0 {
        return Err(PanoError::InvalidInput("warped images span an unbounded canvas"));
    }

    Ok(CanvasLayout {
        width: span[0] as usize,
        height: span[1] as usize,
        offset: [-lo[0] as i64, -lo[1] as i64],
    })
}

#[cfg(test)]
mod tests {
    use super::{sum_layout, tight_layout, CanvasLayout};
    use crate::homography::Homography;
    use crate::image::OwnedImage;

    #[test]
    fn single_image_gets_double_canvas() {
        let images = vec![OwnedImage::zeros(31, 20).unwrap()];
        let layout = sum_layout(&images, 0).unwrap();
        assert_eq!(
            layout,
            CanvasLayout {
                width: 62,
                height: 40,
                offset: [16, 10]
            }
        );
    }

    #[test]
    fn sum_layout_centres_anchor() {
        let images = vec![
            OwnedImage::zeros(10, 8).unwrap(),
            OwnedImage::zeros(12, 8).unwrap(),
            OwnedImage::zeros(10, 8).unwrap(),
        ];
        let layout = sum_layout(&images, 1).unwrap();
        assert_eq!((layout.width, layout.height), (32, 24));
        assert_eq!(layout.offset, [10, 8]);
    }

    #[test]
    fn tight_layout_spans_translated_images() {
        let images = vec![
            OwnedImage::zeros(10, 8).unwrap(),
            OwnedImage::zeros(10, 8).unwrap(),
        ];
        let transforms = [Homography::translation(-6.0, 2.0), Homography::identity()];
        let layout = tight_layout(&images, &transforms).unwrap();
        assert_eq!(
            layout,
            CanvasLayout {
                width: 16,
                height: 10,
                offset: [6, 0]
            }
        );
    }
}

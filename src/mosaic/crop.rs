//! Cropping the empty border of a composed canvas.
//!
//! The canvas is binarised (`> 0` is foreground) and split into 8-connected
//! components. Only each component's outer extent matters, so interior holes
//! never shrink the result. The component with the largest bounding box wins;
//! ties go to the component found first in raster order.

use crate::image::{ImageView, OwnedImage};
use crate::trace::{trace_event, trace_span};
use crate::util::{PanoError, PanoResult};
use std::collections::VecDeque;

const NEIGHBORS_8: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Axis-aligned rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    /// Left column.
    pub x: usize,
    /// Top row.
    pub y: usize,
    /// Width in pixels (at least 1).
    pub width: usize,
    /// Height in pixels (at least 1).
    pub height: usize,
}

impl CropRect {
    /// Bounding box area in pixels.
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Returns the bounding rectangle of the dominant foreground component.
pub fn crop_bounds(view: ImageView<'_, u8>) -> PanoResult<CropRect> {
    let _span = trace_span!("crop_bounds", width = view.width(), height = view.height()).entered();

    let (w, h) = (view.width(), view.height());
    let mut visited = vec![false; w * h];
    let mut queue = VecDeque::new();
    let mut best: Option<CropRect> = None;
    let mut components = 0usize;

    for y in 0..h {
        let row = view.row(y).ok_or(PanoError::InvalidInput("canvas row out of range"))?;
        for x in 0..w {
            if row[x] == 0 || visited[y * w + x] {
                continue;
            }
            components += 1;
            visited[y * w + x] = true;
            queue.push_back((x, y));
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

            while let Some((cx, cy)) = queue.pop_front() {
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);
                for (dx, dy) in NEIGHBORS_8 {
                    let (Some(nx), Some(ny)) =
                        (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h || visited[ny * w + nx] {
                        continue;
                    }
                    if view.get(nx, ny).is_some_and(|&v| v > 0) {
                        visited[ny * w + nx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }

            let rect = CropRect {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            };
            if best.map_or(true, |b| rect.area() > b.area()) {
                best = Some(rect);
            }
        }
    }

    let rect = best.ok_or(PanoError::EmptyCanvas)?;
    trace_event!("crop", components = components, width = rect.width, height = rect.height);
    Ok(rect)
}

/// Crops `view` to [`crop_bounds`].
pub fn crop(view: ImageView<'_, u8>) -> PanoResult<OwnedImage> {
    let rect = crop_bounds(view)?;
    let roi = view.roi(rect.x, rect.y, rect.width, rect.height)?;
    OwnedImage::from_view(roi)
}

#[cfg(test)]
mod tests {
    use super::{crop, crop_bounds, CropRect};
    use crate::image::OwnedImage;
    use crate::util::PanoError;

    fn canvas_with(w: usize, h: usize, fill: &[(usize, usize, usize, usize, u8)]) -> OwnedImage {
        let mut data = vec![0u8; w * h];
        for &(x0, y0, rw, rh, v) in fill {
            for y in y0..y0 + rh {
                for x in x0..x0 + rw {
                    data[y * w + x] = v;
                }
            }
        }
        OwnedImage::new(data, w, h).unwrap()
    }

    #[test]
    fn single_block_is_cropped_tightly() {
        let canvas = canvas_with(20, 10, &[(3, 2, 5, 4, 7)]);
        let rect = crop_bounds(canvas.view()).unwrap();
        assert_eq!(
            rect,
            CropRect {
                x: 3,
                y: 2,
                width: 5,
                height: 4
            }
        );
        let out = crop(canvas.view()).unwrap();
        assert_eq!(out.width(), 5);
        assert!(out.data().iter().all(|&v| v == 7));
    }

    #[test]
    fn holes_do_not_shrink_bounds() {
        let mut canvas = canvas_with(12, 12, &[(1, 1, 10, 10, 50)]);
        let mut data = canvas.clone().into_vec();
        for y in 4..8 {
            for x in 4..8 {
                data[y * 12 + x] = 0;
            }
        }
        canvas = OwnedImage::new(data, 12, 12).unwrap();
        let rect = crop_bounds(canvas.view()).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (1, 1, 10, 10));
    }

    #[test]
    fn largest_component_wins_and_diagonals_connect() {
        let canvas = canvas_with(
            20,
            20,
            &[(0, 0, 2, 2, 1), (2, 2, 2, 2, 1), (10, 10, 3, 3, 1)],
        );
        let rect = crop_bounds(canvas.view()).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 4, 4));
    }

    #[test]
    fn ties_keep_first_in_raster_order() {
        let canvas = canvas_with(20, 20, &[(12, 1, 3, 3, 1), (1, 10, 3, 3, 1)]);
        let rect = crop_bounds(canvas.view()).unwrap();
        assert_eq!((rect.x, rect.y), (12, 1));
    }

    #[test]
    fn blank_canvas_is_an_error() {
        let canvas = OwnedImage::zeros(5, 5).unwrap();
        assert_eq!(crop_bounds(canvas.view()), Err(PanoError::EmptyCanvas));
    }
}

//! Image views and owned grayscale buffers.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. ROI slices are zero-copy
//! views into the same backing slice and retain the original stride.
//!
//! Source images stay read-only for the whole pipeline; the compositor only
//! writes into an `OwnedImage` canvas it allocates itself.

use crate::util::{PanoError, PanoResult};

#[cfg(feature = "image-io")]
pub mod io;
mod owned;

pub use owned::OwnedImage;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> PanoResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> PanoResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(PanoError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> PanoResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(PanoError::InvalidDimensions { width, height });
        }

        let out_of_bounds = PanoError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(PanoError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self.data.get(start..).ok_or(PanoError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;

        ImageView::new(data, width, height, self.stride)
    }
}

impl ImageView<'_, u8> {
    /// Samples the image at a fractional position with bilinear weights.
    ///
    /// Pixel centers sit on integer coordinates. Returns `None` when `(x, y)`
    /// falls outside `[0, width - 1] x [0, height - 1]` (with a small epsilon),
    /// which the compositor treats as "no coverage".
    pub fn sample_bilinear(&self, x: f64, y: f64) -> Option<f32> {
        let max_x = self.width as f64 - 1.0;
        let max_y = self.height as f64 - 1.0;
        let epsilon = 1e-6;
        if !x.is_finite()
            || !y.is_finite()
            || x < -epsilon
            || y < -epsilon
            || x > max_x + epsilon
            || y > max_y + epsilon
        {
            return None;
        }

        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = (x - x0 as f64) as f32;
        let fy = (y - y0 as f64) as f32;

        let row0 = self.row(y0)?;
        let row1 = self.row(y1)?;
        let a = row0[x0] as f32;
        let b = row0[x1] as f32;
        let c = row1[x0] as f32;
        let d = row1[x1] as f32;

        let top = a + (b - a) * fx;
        let bottom = c + (d - c) * fx;
        Some(top + (bottom - top) * fy)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> PanoResult<usize> {
    if width == 0 || height == 0 {
        return Err(PanoError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(PanoError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(PanoError::InvalidDimensions { width, height })?;
    Ok(needed)
}

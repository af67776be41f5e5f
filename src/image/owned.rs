//! Owned contiguous grayscale buffers for source images and canvases.

use crate::image::ImageView;
use crate::util::{PanoError, PanoResult};

/// Owned contiguous grayscale image buffer (`stride == width`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a row-major buffer of exactly `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> PanoResult<Self> {
        let needed = checked_area(width, height)?;
        if data.len() < needed {
            return Err(PanoError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(PanoError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Allocates an image filled with the empty sentinel (0).
    pub fn zeros(width: usize, height: usize) -> PanoResult<Self> {
        let len = checked_area(width, height)?;
        Ok(Self {
            data: vec![0u8; len],
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a contiguous owned image.
    pub fn from_view(view: ImageView<'_, u8>) -> PanoResult<Self> {
        let width = view.width();
        let height = view.height();
        let mut data = Vec::with_capacity(checked_area(width, height)?);
        for y in 0..height {
            let row = view.row(y).ok_or(PanoError::BufferTooSmall {
                needed: y.saturating_mul(view.stride()).saturating_add(width),
                got: view.as_slice().len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, width, height)
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the pixel buffer in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the image and returns its pixel buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

fn checked_area(width: usize, height: usize) -> PanoResult<usize> {
    if width == 0 || height == 0 {
        return Err(PanoError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(PanoError::InvalidDimensions { width, height })
}

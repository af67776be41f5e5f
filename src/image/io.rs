//! Convenience helpers for loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ImageView, OwnedImage};
use crate::util::{PanoError, PanoResult};
use std::path::Path;

/// Creates a borrowed view from a grayscale image buffer.
pub fn view_from_gray_image(img: &image::GrayImage) -> PanoResult<ImageView<'_, u8>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    ImageView::from_slice(img.as_raw(), width, height)
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> PanoResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImage::new(img.as_raw().clone(), width, height)
}

/// Converts an owned image back into an `image::GrayImage`.
pub fn to_gray_image(img: &OwnedImage) -> PanoResult<image::GrayImage> {
    let width = u32::try_from(img.width()).map_err(|_| PanoError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    let height = u32::try_from(img.height()).map_err(|_| PanoError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    image::GrayImage::from_raw(width, height, img.data().to_vec()).ok_or(
        PanoError::BufferTooSmall {
            needed: img.width() * img.height(),
            got: img.data().len(),
        },
    )
}

/// Loads an image from disk and converts it to a grayscale owned image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> PanoResult<OwnedImage> {
    let img = image::open(path).map_err(|err| PanoError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_gray_image(&img.to_luma8())
}

/// Writes a grayscale owned image to disk; the format follows the extension.
pub fn save_gray_image<P: AsRef<Path>>(img: &OwnedImage, path: P) -> PanoResult<()> {
    to_gray_image(img)?
        .save(path)
        .map_err(|err| PanoError::ImageIo {
            reason: err.to_string(),
        })
}

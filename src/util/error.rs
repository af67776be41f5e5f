//! Error types for panostitch.

use thiserror::Error;

/// Result alias for panostitch operations.
pub type PanoResult<T> = std::result::Result<T, PanoError>;

/// Errors that can occur while matching, aligning, or compositing images.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PanoError {
    /// Image dimensions are zero or overflow the address space.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer does not hold the described image.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region of interest does not fit inside the image.
    #[error(
        "roi ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// An index into a sequence is out of range.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Too few point correspondences to fit a homography.
    #[error("insufficient correspondences: need {needed}, got {got}")]
    InsufficientCorrespondences { needed: usize, got: usize },
    /// RANSAC found no candidate transform with any inlier support.
    #[error("no homography found: images do not appear to overlap")]
    NoHomographyFound,
    /// Cropping found no written pixels on the canvas.
    #[error("canvas has no foreground pixels")]
    EmptyCanvas,
    /// Estimation was aborted through a cancel token.
    #[error("operation cancelled")]
    Cancelled,
    /// Aligning one adjacent pair of the sequence failed.
    #[error("alignment of image {from} onto image {to} failed: {source}")]
    PairFailed {
        from: usize,
        to: usize,
        #[source]
        source: Box<PanoError>,
    },
    /// Decoding or encoding an image file failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}

impl PanoError {
    /// Wraps `self` with the indices of the pair being aligned.
    ///
    /// Cancellation is not specific to a pair and passes through unchanged.
    pub(crate) fn for_pair(self, from: usize, to: usize) -> Self {
        match self {
            PanoError::Cancelled => PanoError::Cancelled,
            other => PanoError::PairFailed {
                from,
                to,
                source: Box::new(other),
            },
        }
    }
}

//! Keypoints, descriptors, and the feature-extraction capability.
//!
//! The pipeline only needs a location per keypoint and a fixed-length
//! descriptor compared under Euclidean distance. Detectors plug in through
//! [`FeatureExtractor`]; [`HarrisPatchExtractor`] is the built-in default.

mod descriptor;
mod harris;

pub use descriptor::patch_descriptor;
pub use harris::{HarrisConfig, HarrisPatchExtractor};

use crate::image::ImageView;
use crate::util::{PanoError, PanoResult};

/// Detected keypoint in an image's pixel frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Column coordinate in pixels.
    pub x: f32,
    /// Row coordinate in pixels.
    pub y: f32,
    /// Detector response; opaque to matching.
    pub response: f32,
    /// Diameter of the described neighbourhood; opaque to matching.
    pub size: f32,
}

/// Keypoints and their descriptors for one image, index-aligned.
///
/// Descriptors are stored back to back in one buffer so distance kernels can
/// walk them without per-feature allocations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<f32>,
    descriptor_len: usize,
}

impl FeatureSet {
    /// Creates an empty set whose descriptors all have `descriptor_len` values.
    pub fn new(descriptor_len: usize) -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: Vec::new(),
            descriptor_len,
        }
    }

    /// Appends a keypoint with its descriptor.
    pub fn push(&mut self, keypoint: Keypoint, descriptor: &[f32]) -> PanoResult<()> {
        if descriptor.len() != self.descriptor_len || self.descriptor_len == 0 {
            return Err(PanoError::InvalidInput("descriptor length mismatch"));
        }
        self.keypoints.push(keypoint);
        self.descriptors.extend_from_slice(descriptor);
        Ok(())
    }

    /// Returns the number of features.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Returns true if the image produced no features.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Returns the descriptor length shared by every feature.
    pub fn descriptor_len(&self) -> usize {
        self.descriptor_len
    }

    /// Returns all keypoints.
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns the keypoint at `idx`.
    pub fn keypoint(&self, idx: usize) -> Option<&Keypoint> {
        self.keypoints.get(idx)
    }

    /// Returns the descriptor at `idx`.
    pub fn descriptor(&self, idx: usize) -> Option<&[f32]> {
        if idx >= self.keypoints.len() {
            return None;
        }
        let start = idx * self.descriptor_len;
        self.descriptors.get(start..start + self.descriptor_len)
    }

    /// Iterates over descriptors in keypoint order.
    pub fn descriptors(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.descriptors.chunks_exact(self.descriptor_len.max(1))
    }
}

/// Capability that turns an image into keypoints and descriptors.
///
/// Implementations must be deterministic for a given image, return an empty
/// set for blank images, and never fail on a well-formed image.
pub trait FeatureExtractor: Sync {
    /// Detects keypoints and computes their descriptors.
    fn extract(&self, image: ImageView<'_, u8>) -> FeatureSet;
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for &E {
    fn extract(&self, image: ImageView<'_, u8>) -> FeatureSet {
        (**self).extract(image)
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for Box<E> {
    fn extract(&self, image: ImageView<'_, u8>) -> FeatureSet {
        (**self).extract(image)
    }
}

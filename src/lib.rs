//! panostitch builds panoramic mosaics from ordered sequences of overlapping
//! grayscale images.
//!
//! The pipeline detects keypoints with descriptors, matches them between
//! neighbouring images, fits a pairwise homography per adjacent pair with
//! RANSAC, chains the homographies outward from an anchor image, warps every
//! image onto one canvas and crops the empty border. Parallelism is available
//! via the `rayon` feature and SIMD descriptor distances via `simd`.

mod candidate;
pub mod features;
pub mod homography;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod matching;
pub mod mosaic;
pub(crate) mod trace;
pub mod util;
#[cfg(feature = "image-io")]
pub mod viz;

pub use features::{FeatureExtractor, FeatureSet, HarrisConfig, HarrisPatchExtractor, Keypoint};
pub use homography::{
    estimate_homography, estimate_homography_with_rng, CancelToken, Homography, HomographyFit,
    RansacConfig,
};
pub use image::{ImageView, OwnedImage};
pub use matching::{
    best_n, point_pairs, Correspondence, FeatureMatcher, MatchStrategy, MatcherConfig, PointPair,
};
pub use mosaic::{
    crop, crop_bounds, CanvasSizing, Composition, CropRect, MosaicBuilder, MosaicConfig,
    PairAlignment,
};
pub use util::{PanoError, PanoResult};

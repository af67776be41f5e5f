//! Low-level building blocks for custom stitching pipelines.
//!
//! These expose the candidate selection used by the detector, the distance
//! kernels, the raw DLT fit and the warping primitive. Most users should
//! prefer [`crate::MosaicBuilder`] and [`crate::FeatureMatcher`].

pub use crate::candidate::nms::nms_2d;
pub use crate::candidate::topk::{Peak, TopK};
pub use crate::features::patch_descriptor;
pub use crate::homography::fit_dlt;
pub use crate::kernel::{nearest_all, two_nearest, DistanceKernel, Neighbors};
pub use crate::mosaic::warp_perspective_transparent;

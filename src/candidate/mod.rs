//! Candidate selection and pruning utilities for keypoint detection.
//!
//! Includes Top-K collection and spatial non-maximum suppression.

pub(crate) mod nms;
pub(crate) mod topk;

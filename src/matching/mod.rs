//! Descriptor matching between two images.
//!
//! Two strategies are supported:
//! - [`MatchStrategy::CrossCheck`] keeps mutual nearest neighbours and returns
//!   them sorted by ascending distance, so a prefix is the "best N".
//! - [`MatchStrategy::RatioTest`] keeps a query's nearest neighbour when it is
//!   clearly closer than the second one (`d1 < ratio * d2`). Output stays in
//!   query-index order; [`best_n`] on a ratio-test result therefore truncates
//!   by index, not by score.

use crate::features::{FeatureExtractor, FeatureSet};
use crate::image::ImageView;
use crate::kernel::{nearest_all, DefaultKernel, Neighbors};
use crate::trace::{trace_event, trace_span};
use crate::util::{PanoError, PanoResult};

/// Default Lowe ratio used by [`MatchStrategy::ratio_test`].
pub const DEFAULT_RATIO: f32 = 0.7;

/// A correspondence between keypoint `query_idx` of image A and keypoint
/// `train_idx` of image B.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    /// Index into the query (first) feature set.
    pub query_idx: usize,
    /// Index into the train (second) feature set.
    pub train_idx: usize,
    /// Euclidean descriptor distance.
    pub distance: f32,
}

/// Matching strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum MatchStrategy {
    /// Mutual nearest neighbours, sorted by distance.
    #[default]
    CrossCheck,
    /// Two-nearest-neighbour ratio test, in query order.
    RatioTest {
        /// Accept when `d1 < ratio * d2`.
        ratio: f32,
    },
}

impl MatchStrategy {
    /// Ratio test with the default threshold of 0.7.
    pub fn ratio_test() -> Self {
        MatchStrategy::RatioTest {
            ratio: DEFAULT_RATIO,
        }
    }
}

/// Configuration for [`FeatureMatcher`].
#[derive(Clone, Debug, Default)]
pub struct MatcherConfig {
    /// Matching strategy.
    pub strategy: MatchStrategy,
    /// Run the nearest-neighbour search in parallel (requires `rayon`).
    pub parallel: bool,
}

/// Matches descriptors between image pairs.
#[derive(Clone, Debug, Default)]
pub struct FeatureMatcher {
    cfg: MatcherConfig,
}

impl FeatureMatcher {
    /// Creates a matcher with default settings (cross-check, sequential).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a matcher with the provided configuration.
    pub fn with_config(mut self, cfg: MatcherConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatcherConfig {
        &self.cfg
    }

    /// Extracts features from both images and matches them.
    pub fn match_images<E: FeatureExtractor + ?Sized>(
        &self,
        extractor: &E,
        a: ImageView<'_, u8>,
        b: ImageView<'_, u8>,
    ) -> PanoResult<Vec<Correspondence>> {
        let fa = extractor.extract(a);
        let fb = extractor.extract(b);
        self.match_features(&fa, &fb)
    }

    /// Matches precomputed feature sets of images A (query) and B (train).
    ///
    /// Returns an empty list if either side has no descriptors.
    pub fn match_features(
        &self,
        query: &FeatureSet,
        train: &FeatureSet,
    ) -> PanoResult<Vec<Correspondence>> {
        let _span = trace_span!("match_features", query = query.len(), train = train.len())
            .entered();

        if query.is_empty() || train.is_empty() {
            return Ok(Vec::new());
        }
        if query.descriptor_len() != train.descriptor_len() {
            return Err(PanoError::InvalidInput("descriptor length mismatch"));
        }

        let matches = match self.cfg.strategy {
            MatchStrategy::CrossCheck => {
                let forward = self.nearest(query, train);
                let backward = self.nearest(train, query);
                cross_check(&forward, &backward)
            }
            MatchStrategy::RatioTest { ratio } => {
                if !(ratio > 0.0 && ratio <= 1.0) {
                    return Err(PanoError::InvalidInput("ratio must be in (0, 1]"));
                }
                ratio_test(&self.nearest(query, train), ratio)
            }
        };

        trace_event!("matches", count = matches.len());
        Ok(matches)
    }

    #[cfg(feature = "rayon")]
    fn nearest(&self, query: &FeatureSet, train: &FeatureSet) -> Vec<Neighbors> {
        if self.cfg.parallel {
            crate::kernel::rayon::nearest_all_par::<DefaultKernel>(query, train)
        } else {
            nearest_all::<DefaultKernel>(query, train)
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn nearest(&self, query: &FeatureSet, train: &FeatureSet) -> Vec<Neighbors> {
        nearest_all::<DefaultKernel>(query, train)
    }
}

fn cross_check(forward: &[Neighbors], backward: &[Neighbors]) -> Vec<Correspondence> {
    let mut out = Vec::new();
    for (query_idx, nn) in forward.iter().enumerate() {
        let Some((train_idx, distance)) = nn.first else {
            continue;
        };
        let mutual = backward
            .get(train_idx)
            .and_then(|back| back.first)
            .is_some_and(|(back_idx, _)| back_idx == query_idx);
        if mutual {
            out.push(Correspondence {
                query_idx,
                train_idx,
                distance,
            });
        }
    }
    // Stable sort keeps query order among equal distances.
    out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    out
}

fn ratio_test(forward: &[Neighbors], ratio: f32) -> Vec<Correspondence> {
    forward
        .iter()
        .enumerate()
        .filter_map(|(query_idx, nn)| {
            let (train_idx, d1) = nn.first?;
            let (_, d2) = nn.second?;
            (d1 < ratio * d2).then_some(Correspondence {
                query_idx,
                train_idx,
                distance: d1,
            })
        })
        .collect()
}

/// Returns the first `n` correspondences in the sequence's own order.
///
/// For cross-check output this is the `n` lowest distances; for ratio-test
/// output it is the `n` lowest query indices.
pub fn best_n(matches: &[Correspondence], n: usize) -> &[Correspondence] {
    &matches[..n.min(matches.len())]
}

/// Point pair `(src, dst)` taken from a correspondence's keypoint locations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointPair {
    /// Location in the query image.
    pub src: [f64; 2],
    /// Location in the train image.
    pub dst: [f64; 2],
}

/// Resolves correspondences to keypoint locations.
///
/// Correspondences referring to keypoints that do not exist are rejected.
pub fn point_pairs(
    query: &FeatureSet,
    train: &FeatureSet,
    matches: &[Correspondence],
) -> PanoResult<Vec<PointPair>> {
    matches
        .iter()
        .map(|m| {
            let a = query.keypoint(m.query_idx).ok_or(PanoError::IndexOutOfBounds {
                index: m.query_idx,
                len: query.len(),
                context: "query keypoint",
            })?;
            let b = train.keypoint(m.train_idx).ok_or(PanoError::IndexOutOfBounds {
                index: m.train_idx,
                len: train.len(),
                context: "train keypoint",
            })?;
            Ok(PointPair {
                src: [a.x as f64, a.y as f64],
                dst: [b.x as f64, b.y as f64],
            })
        })
        .collect()
}

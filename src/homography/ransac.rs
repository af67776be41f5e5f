//! RANSAC homography estimation.
//!
//! Minimal samples of four correspondences are drawn from a seeded RNG, so a
//! given seed and input always produce the same result. Samples with three
//! (nearly) collinear points in either image are skipped. The consensus with
//! the most inliers is refit over all of its inliers; the refit is kept only
//! if it does not lose inliers.

use crate::homography::{fit_dlt, Homography};
use crate::matching::PointPair;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::any_three_collinear;
use crate::util::{PanoError, PanoResult};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SAMPLE_SIZE: usize = 4;

/// Shared flag used to abort a running estimation.
///
/// Clones share the same flag; cancelling any clone cancels all of them.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// RANSAC parameters.
#[derive(Clone, Debug)]
pub struct RansacConfig {
    /// Upper bound on the number of minimal samples drawn.
    pub max_iters: usize,
    /// Inlier threshold on the forward reprojection error, in pixels.
    pub reproj_threshold: f64,
    /// Desired probability of drawing at least one all-inlier sample; used to
    /// stop early once a good consensus is found. `1.0` disables early exit.
    pub confidence: f64,
    /// Minimum triangle area (px^2) for any three points of a sample.
    pub min_sample_area: f64,
    /// Seed for the sampling RNG.
    pub seed: u64,
    /// Stop sampling after this wall-clock budget, keeping the best model.
    pub time_budget: Option<Duration>,
    /// Abort with [`PanoError::Cancelled`] when this token is cancelled.
    pub cancel: Option<CancelToken>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            reproj_threshold: 1.0,
            confidence: 0.995,
            min_sample_area: 1.0,
            seed: 0,
            time_budget: None,
            cancel: None,
        }
    }
}

impl RansacConfig {
    fn validate(&self) -> PanoResult<()> {
        if !(self.reproj_threshold.is_finite() && self.reproj_threshold > 0.0) {
            return Err(PanoError::InvalidInput("reprojection threshold must be > 0"));
        }
        if !(self.confidence > 0.0 && self.confidence <= 1.0) {
            return Err(PanoError::InvalidInput("confidence must be in (0, 1]"));
        }
        if self.max_iters == 0 {
            return Err(PanoError::InvalidInput("max_iters must be > 0"));
        }
        Ok(())
    }
}

/// Estimated homography with its consensus set.
#[derive(Clone, Debug, PartialEq)]
pub struct HomographyFit {
    /// Transform mapping `src` points onto `dst` points.
    pub homography: Homography,
    /// Indices of the input pairs within the reprojection threshold.
    pub inliers: Vec<usize>,
    /// Number of minimal samples drawn.
    pub iterations: usize,
}

impl HomographyFit {
    /// Number of inliers.
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}

/// Estimates the homography mapping `src` onto `dst` with RANSAC, seeding the
/// sampler from `cfg.seed`.
pub fn estimate_homography(pairs: &[PointPair], cfg: &RansacConfig) -> PanoResult<HomographyFit> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    estimate_homography_with_rng(pairs, cfg, &mut rng)
}

/// Estimates the homography with a caller-provided random source.
///
/// `cfg.seed` is ignored.
pub fn estimate_homography_with_rng<R: Rng + ?Sized>(
    pairs: &[PointPair],
    cfg: &RansacConfig,
    rng: &mut R,
) -> PanoResult<HomographyFit> {
    let n = pairs.len();
    if n < SAMPLE_SIZE {
        return Err(PanoError::InsufficientCorrespondences {
            needed: SAMPLE_SIZE,
            got: n,
        });
    }
    cfg.validate()?;
    let _span = trace_span!("ransac", pairs = n).entered();

    let start = Instant::now();
    let mut best: Option<(Homography, Vec<usize>)> = None;
    let mut iter_limit = cfg.max_iters;
    let mut iterations = 0usize;
    let mut sample = [PointPair {
        src: [0.0; 2],
        dst: [0.0; 2],
    }; SAMPLE_SIZE];

    while iterations < iter_limit {
        if cfg.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(PanoError::Cancelled);
        }
        if cfg.time_budget.is_some_and(|budget| start.elapsed() >= budget) {
            trace_event!("ransac_time_budget", iterations = iterations);
            break;
        }
        iterations += 1;

        let picked = index::sample(rng, n, SAMPLE_SIZE);
        for (slot, idx) in sample.iter_mut().zip(picked.iter()) {
            *slot = pairs[idx];
        }
        let src = sample.map(|p| p.src);
        let dst = sample.map(|p| p.dst);
        if any_three_collinear(src, cfg.min_sample_area)
            || any_three_collinear(dst, cfg.min_sample_area)
        {
            continue;
        }

        let Ok(h) = fit_dlt(&sample) else {
            continue;
        };
        let inliers = collect_inliers(&h, pairs, cfg.reproj_threshold);
        let best_count = best.as_ref().map_or(0, |(_, b)| b.len());
        if inliers.len() > best_count {
            trace_debug!("ransac_improved", iteration = iterations, inliers = inliers.len());
            iter_limit = iter_limit.min(required_iterations(
                inliers.len(),
                n,
                cfg.confidence,
                cfg.max_iters,
            ));
            best = Some((h, inliers));
        }
    }

    let Some((mut homography, mut inliers)) = best else {
        return Err(PanoError::NoHomographyFound);
    };
    if inliers.len() < SAMPLE_SIZE {
        return Err(PanoError::NoHomographyFound);
    }

    let consensus: Vec<PointPair> = inliers.iter().map(|&i| pairs[i]).collect();
    if let Ok(refit) = fit_dlt(&consensus) {
        let refit_inliers = collect_inliers(&refit, pairs, cfg.reproj_threshold);
        if refit_inliers.len() >= inliers.len() {
            homography = refit;
            inliers = refit_inliers;
        }
    }

    trace_event!("homography", inliers = inliers.len(), iterations = iterations);
    Ok(HomographyFit {
        homography,
        inliers,
        iterations,
    })
}

fn collect_inliers(h: &Homography, pairs: &[PointPair], threshold: f64) -> Vec<usize> {
    pairs
        .iter()
        .enumerate()
        .filter(|(_, p)| h.reprojection_error(p) < threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Number of samples needed to hit an all-inlier sample with probability
/// `confidence`, given the current inlier ratio.
fn required_iterations(inliers: usize, total: usize, confidence: f64, cap: usize) -> usize {
    if confidence >= 1.0 {
        return cap;
    }
    let ratio = inliers as f64 / total as f64;
    let all_inlier = ratio.powi(SAMPLE_SIZE as i32);
    if all_inlier >= 1.0 - f64::EPSILON {
        return 1;
    }
    if all_inlier <= f64::EPSILON {
        return cap;
    }
    let needed = (1.0 - confidence).ln() / (1.0 - all_inlier).ln();
    if !needed.is_finite() {
        return cap;
    }
    (needed.ceil() as usize).clamp(1, cap)
}

#[cfg(test)]
mod tests {
    use super::{estimate_homography, required_iterations, CancelToken, RansacConfig};
    use crate::homography::Homography;
    use crate::matching::PointPair;
    use crate::util::PanoError;

    fn grid_pairs(h: &Homography) -> Vec<PointPair> {
        (0..8)
            .flat_map(|i| (0..6).map(move |j| [i as f64 * 15.0 + 3.0, j as f64 * 17.0 + 5.0]))
            .map(|s| PointPair {
                src: s,
                dst: h.apply(s[0], s[1]).unwrap(),
            })
            .collect()
    }

    #[test]
    fn exact_translation_keeps_all_inliers() {
        let h = Homography::translation(-40.0, 3.0);
        let pairs = grid_pairs(&h);
        let fit = estimate_homography(&pairs, &RansacConfig::default()).unwrap();
        assert_eq!(fit.inliers.len(), pairs.len());
        assert!((fit.homography.matrix() - h.matrix()).amax() < 1e-6);
    }

    #[test]
    fn same_seed_same_result() {
        let h = Homography::from_row_slice(&[1.0, 0.02, 10.0, -0.01, 1.0, 4.0, 0.0, 0.0, 1.0]);
        let mut pairs = grid_pairs(&h);
        pairs[3].dst = [500.0, -20.0];
        pairs[11].dst = [0.0, 0.0];
        let cfg = RansacConfig {
            seed: 17,
            ..RansacConfig::default()
        };
        let a = estimate_homography(&pairs, &cfg).unwrap();
        let b = estimate_homography(&pairs, &cfg).unwrap();
        assert_eq!(a, b);
        assert!(!a.inliers.contains(&3) && !a.inliers.contains(&11));
    }

    #[test]
    fn collinear_input_has_no_model() {
        let pairs: Vec<PointPair> = (0..10)
            .map(|i| PointPair {
                src: [i as f64 * 10.0, 0.0],
                dst: [i as f64 * 10.0 + 5.0, 0.0],
            })
            .collect();
        assert_eq!(
            estimate_homography(&pairs, &RansacConfig::default()),
            Err(PanoError::NoHomographyFound)
        );
    }

    #[test]
    fn cancelled_token_aborts() {
        let token = CancelToken::new();
        token.cancel();
        let cfg = RansacConfig {
            cancel: Some(token.clone()),
            ..RansacConfig::default()
        };
        let pairs = grid_pairs(&Homography::identity());
        assert_eq!(estimate_homography(&pairs, &cfg), Err(PanoError::Cancelled));
        assert!(token.is_cancelled());
    }

    #[test]
    fn invalid_threshold_rejected() {
        let cfg = RansacConfig {
            reproj_threshold: 0.0,
            ..RansacConfig::default()
        };
        let pairs = grid_pairs(&Homography::identity());
        assert!(matches!(
            estimate_homography(&pairs, &cfg),
            Err(PanoError::InvalidInput(_))
        ));
    }

    #[test]
    fn iteration_bound_shrinks_with_inlier_ratio() {
        assert_eq!(required_iterations(10, 10, 0.995, 2000), 1);
        let half = required_iterations(50, 100, 0.995, 2000);
        let most = required_iterations(90, 100, 0.995, 2000);
        assert!(most < half && half <= 2000);
        assert_eq!(required_iterations(1, 1000, 0.995, 2000), 2000);
        assert_eq!(required_iterations(90, 100, 1.0, 2000), 2000);
    }
}

//! Harris corner detector paired with normalised patch descriptors.
//!
//! Responses come from the structure tensor of Sobel gradients summed over a
//! square window: `R = det(M) - k * trace(M)^2`. Candidates are 3x3 local
//! maxima above `min_response_ratio * max(R)`, pruned by Chebyshev NMS and
//! capped at `max_features`. Every step is deterministic.

use crate::candidate::nms::nms_2d;
use crate::candidate::topk::{Peak, TopK};
use crate::features::descriptor::patch_descriptor;
use crate::features::{FeatureExtractor, FeatureSet, Keypoint};
use crate::image::ImageView;
use crate::trace::{trace_event, trace_span};

/// Configuration for [`HarrisPatchExtractor`].
#[derive(Clone, Debug)]
pub struct HarrisConfig {
    /// Maximum number of features returned per image.
    pub max_features: usize,
    /// Harris sensitivity constant.
    pub k: f32,
    /// Radius of the structure-tensor summation window.
    pub window_radius: usize,
    /// Responses below this fraction of the strongest response are dropped.
    pub min_response_ratio: f32,
    /// Chebyshev radius for non-maximum suppression between corners.
    pub nms_radius: usize,
    /// Radius of the descriptor patch (side `2 * r + 1`).
    pub patch_radius: usize,
}

impl Default for HarrisConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            k: 0.04,
            window_radius: 2,
            min_response_ratio: 0.01,
            nms_radius: 3,
            patch_radius: 5,
        }
    }
}

/// Built-in feature extractor: Harris corners with patch descriptors.
#[derive(Clone, Debug, Default)]
pub struct HarrisPatchExtractor {
    cfg: HarrisConfig,
}

impl HarrisPatchExtractor {
    /// Creates an extractor with the given configuration.
    pub fn new(cfg: HarrisConfig) -> Self {
        Self { cfg }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &HarrisConfig {
        &self.cfg
    }

    /// Computes the Harris response map; pixels without a full window are 0.
    pub fn response_map(&self, image: ImageView<'_, u8>) -> Vec<f32> {
        let width = image.width();
        let height = image.height();
        let mut response = vec![0.0f32; width * height];
        if width < 3 || height < 3 {
            return response;
        }

        let mut gx = vec![0.0f32; width * height];
        let mut gy = vec![0.0f32; width * height];
        for y in 1..height - 1 {
            let (Some(up), Some(mid), Some(down)) =
                (image.row(y - 1), image.row(y), image.row(y + 1))
            else {
                return response;
            };
            for x in 1..width - 1 {
                let p = |row: &[u8], dx: usize| row[x + dx - 1] as f32;
                let sx = (p(up, 2) + 2.0 * p(mid, 2) + p(down, 2))
                    - (p(up, 0) + 2.0 * p(mid, 0) + p(down, 0));
                let sy = (p(down, 0) + 2.0 * p(down, 1) + p(down, 2))
                    - (p(up, 0) + 2.0 * p(up, 1) + p(up, 2));
                gx[y * width + x] = sx * 0.125;
                gy[y * width + x] = sy * 0.125;
            }
        }

        let r = self.cfg.window_radius;
        let margin = r + 1;
        if width <= 2 * margin || height <= 2 * margin {
            return response;
        }
        for y in margin..height - margin {
            for x in margin..width - margin {
                let mut sxx = 0.0f32;
                let mut syy = 0.0f32;
                let mut sxy = 0.0f32;
                for wy in (y - r)..=(y + r) {
                    let base = wy * width;
                    for wx in (x - r)..=(x + r) {
                        let ix = gx[base + wx];
                        let iy = gy[base + wx];
                        sxx += ix * ix;
                        syy += iy * iy;
                        sxy += ix * iy;
                    }
                }
                let det = sxx * syy - sxy * sxy;
                let trace = sxx + syy;
                response[y * width + x] = det - self.cfg.k * trace * trace;
            }
        }
        response
    }

    fn detect(&self, image: ImageView<'_, u8>) -> Vec<Peak> {
        let width = image.width();
        let height = image.height();
        let response = self.response_map(image);

        let max_response = response.iter().copied().fold(0.0f32, f32::max);
        if max_response <= 0.0 || !max_response.is_finite() {
            return Vec::new();
        }
        let threshold = max_response * self.cfg.min_response_ratio;

        let border = self.cfg.patch_radius.max(self.cfg.window_radius + 1).max(1);
        if width <= 2 * border || height <= 2 * border {
            return Vec::new();
        }

        let mut topk = TopK::new(self.cfg.max_features.saturating_mul(4));
        for y in border..height - border {
            for x in border..width - border {
                let value = response[y * width + x];
                if value <= threshold {
                    continue;
                }
                let mut is_max = true;
                'window: for ny in y - 1..=y + 1 {
                    for nx in x - 1..=x + 1 {
                        if (nx, ny) == (x, y) {
                            continue;
                        }
                        let other = response[ny * width + nx];
                        // Ties resolve to the first pixel in raster order.
                        if other > value || (other == value && (ny, nx) < (y, x)) {
                            is_max = false;
                            break 'window;
                        }
                    }
                }
                if is_max {
                    topk.push(Peak { x, y, score: value });
                }
            }
        }

        let mut peaks = topk.into_sorted_desc();
        let mut kept = nms_2d(&mut peaks, self.cfg.nms_radius);
        kept.truncate(self.cfg.max_features);
        kept
    }
}

impl FeatureExtractor for HarrisPatchExtractor {
    fn extract(&self, image: ImageView<'_, u8>) -> FeatureSet {
        let _span = trace_span!("extract_features", width = image.width(), height = image.height())
            .entered();

        let radius = self.cfg.patch_radius;
        let side = 2 * radius + 1;
        let mut set = FeatureSet::new(side * side);
        let mut desc = Vec::with_capacity(side * side);
        for peak in self.detect(image) {
            if !patch_descriptor(image, peak.x, peak.y, radius, &mut desc) {
                continue;
            }
            let keypoint = Keypoint {
                x: peak.x as f32,
                y: peak.y as f32,
                response: peak.score,
                size: side as f32,
            };
            // Descriptor length is fixed by `patch_radius`, so this cannot fail.
            let _ = set.push(keypoint, &desc);
        }

        trace_event!("features", count = set.len());
        set
    }
}

//! Mosaic composition: chaining pairwise homographies from an anchor image
//! and warping every image onto one canvas.
//!
//! For a sequence `I_0 .. I_{n-1}` and anchor `a`, each image `j != a` is
//! aligned to its neighbour towards the anchor (`j -> j + 1` on the left,
//! `j -> j - 1` on the right). Transforms are chained outward:
//! `T_j = T_{j+1} ∘ H_j` on the left and `T_j = T_{j-1} ∘ H_j` on the right,
//! with `T_a` the identity. Images are drawn in the order anchor, left pass
//! (`a - 1` down to `0`), right pass (`a + 1` up to `n - 1`); later images
//! overwrite earlier ones where they overlap.

mod canvas;
pub mod crop;
mod warp;

pub use canvas::CanvasSizing;
pub use crop::{crop, crop_bounds, CropRect};
pub use warp::warp_perspective_transparent;

use crate::features::{FeatureExtractor, FeatureSet};
use crate::homography::{estimate_homography, Homography, RansacConfig};
use crate::image::OwnedImage;
use crate::matching::{point_pairs, FeatureMatcher, MatcherConfig};
use crate::trace::{trace_event, trace_span};
use crate::util::{PanoError, PanoResult};
use canvas::{sum_layout, tight_layout, CanvasLayout};
use warp::warp_with_offset;

/// Mosaic build configuration.
#[derive(Clone, Debug)]
pub struct MosaicConfig {
    /// Descriptor matching between adjacent images.
    pub matcher: MatcherConfig,
    /// Pairwise homography estimation. Pair `j` samples with `seed + j`.
    pub ransac: RansacConfig,
    /// Canvas sizing policy.
    pub sizing: CanvasSizing,
    /// Extract features and estimate pair homographies in parallel
    /// (requires the `rayon` feature; ignored otherwise).
    pub parallel: bool,
    /// Largest canvas (in pixels) the builder will allocate.
    pub max_canvas_pixels: usize,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            ransac: RansacConfig::default(),
            sizing: CanvasSizing::default(),
            parallel: false,
            max_canvas_pixels: 1 << 28,
        }
    }
}

/// Alignment of one image to its neighbour towards the anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairAlignment {
    /// Image being aligned.
    pub from: usize,
    /// Neighbour it is aligned to.
    pub to: usize,
    /// Transform mapping `from` pixels into `to` pixels.
    pub homography: Homography,
    /// Correspondences fed to RANSAC.
    pub matches: usize,
    /// RANSAC inliers.
    pub inliers: usize,
}

/// Result of [`MosaicBuilder::compose_detailed`].
#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    /// The uncropped canvas.
    pub canvas: OwnedImage,
    /// Canvas position of the anchor image's origin.
    pub anchor_offset: [i64; 2],
    /// Transform of every image into the anchor's frame.
    pub transforms: Vec<Homography>,
    /// Pair alignments in composition order.
    pub pairs: Vec<PairAlignment>,
}

/// Composes an image sequence into a panorama.
#[derive(Clone, Debug)]
pub struct MosaicBuilder<E> {
    extractor: E,
    cfg: MosaicConfig,
}

impl<E: FeatureExtractor> MosaicBuilder<E> {
    /// Creates a builder around a feature extractor with default settings.
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            cfg: MosaicConfig::default(),
        }
    }

    /// Returns a builder with the provided configuration.
    pub fn with_config(mut self, cfg: MosaicConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MosaicConfig {
        &self.cfg
    }

    /// Returns the feature extractor.
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Composes `images` around `images[anchor]` and returns the uncropped
    /// canvas.
    pub fn compose(&self, images: &[OwnedImage], anchor: usize) -> PanoResult<OwnedImage> {
        self.compose_detailed(images, anchor).map(|c| c.canvas)
    }

    /// Like [`MosaicBuilder::compose`], also returning the pair alignments and
    /// the per-image transforms that produced the canvas.
    pub fn compose_detailed(&self, images: &[OwnedImage], anchor: usize) -> PanoResult<Composition> {
        check_sequence(images, anchor)?;
        let _span = trace_span!("compose", images = images.len(), anchor = anchor).entered();

        let pairs = self.align_pairs(images, anchor)?;
        let transforms = chain_transforms(images.len(), anchor, &pairs);
        let layout = match self.cfg.sizing {
            CanvasSizing::Sum => sum_layout(images, anchor)?,
            CanvasSizing::Tight => tight_layout(images, &transforms)?,
        };
        let canvas = self.render(images, anchor, &transforms, layout)?;
        Ok(Composition {
            canvas,
            anchor_offset: layout.offset,
            transforms,
            pairs,
        })
    }

    /// Composes around the middle image (`len / 2`).
    pub fn compose_centered(&self, images: &[OwnedImage]) -> PanoResult<OwnedImage> {
        self.compose(images, images.len() / 2)
    }

    /// Composes around the middle image and crops the empty border.
    pub fn build(&self, images: &[OwnedImage]) -> PanoResult<OwnedImage> {
        let canvas = self.compose_centered(images)?;
        crop(canvas.view())
    }

    /// Returns, for every image, the transform mapping it into the anchor's
    /// frame (the identity for the anchor itself).
    pub fn transforms(&self, images: &[OwnedImage], anchor: usize) -> PanoResult<Vec<Homography>> {
        let pairs = self.align_pairs(images, anchor)?;
        Ok(chain_transforms(images.len(), anchor, &pairs))
    }

    /// Aligns every non-anchor image to its neighbour towards the anchor.
    ///
    /// Pairs are reported in composition order: the left pass from the
    /// anchor outward, then the right pass. The first failing pair in that
    /// order aborts with [`PanoError::PairFailed`].
    pub fn align_pairs(
        &self,
        images: &[OwnedImage],
        anchor: usize,
    ) -> PanoResult<Vec<PairAlignment>> {
        check_sequence(images, anchor)?;
        let features = self.extract_all(images);
        let order: Vec<(usize, usize)> = (0..anchor)
            .rev()
            .map(|j| (j, j + 1))
            .chain((anchor + 1..images.len()).map(|j| (j, j - 1)))
            .collect();
        self.align_all(&features, &order)
    }

    fn align_one(&self, features: &[FeatureSet], from: usize, to: usize) -> PanoResult<PairAlignment> {
        let _span = trace_span!("align_pair", from = from, to = to).entered();
        let matcher = FeatureMatcher::new().with_config(self.cfg.matcher.clone());
        let (query, train) = (&features[from], &features[to]);

        let matches = matcher.match_features(query, train)?;
        let pairs = point_pairs(query, train, &matches)?;
        let ransac = RansacConfig {
            seed: self.cfg.ransac.seed.wrapping_add(from as u64),
            ..self.cfg.ransac.clone()
        };
        let fit = estimate_homography(&pairs, &ransac)?;

        trace_event!(
            "pair_aligned",
            from = from,
            to = to,
            matches = matches.len(),
            inliers = fit.inliers.len()
        );
        Ok(PairAlignment {
            from,
            to,
            homography: fit.homography,
            matches: matches.len(),
            inliers: fit.inliers.len(),
        })
    }

    #[cfg(feature = "rayon")]
    fn extract_all(&self, images: &[OwnedImage]) -> Vec<FeatureSet> {
        use rayon::prelude::*;
        let _span = trace_span!("extract_features", images = images.len()).entered();
        if self.cfg.parallel {
            images
                .par_iter()
                .map(|img| self.extractor.extract(img.view()))
                .collect()
        } else {
            images.iter().map(|img| self.extractor.extract(img.view())).collect()
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn extract_all(&self, images: &[OwnedImage]) -> Vec<FeatureSet> {
        let _span = trace_span!("extract_features", images = images.len()).entered();
        images.iter().map(|img| self.extractor.extract(img.view())).collect()
    }

    #[cfg(feature = "rayon")]
    fn align_all(
        &self,
        features: &[FeatureSet],
        order: &[(usize, usize)],
    ) -> PanoResult<Vec<PairAlignment>> {
        use rayon::prelude::*;
        if !self.cfg.parallel {
            return self.align_sequential(features, order);
        }
        let results: Vec<PanoResult<PairAlignment>> = order
            .par_iter()
            .map(|&(from, to)| {
                self.align_one(features, from, to)
                    .map_err(|e| e.for_pair(from, to))
            })
            .collect();
        results.into_iter().collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn align_all(
        &self,
        features: &[FeatureSet],
        order: &[(usize, usize)],
    ) -> PanoResult<Vec<PairAlignment>> {
        self.align_sequential(features, order)
    }

    fn align_sequential(
        &self,
        features: &[FeatureSet],
        order: &[(usize, usize)],
    ) -> PanoResult<Vec<PairAlignment>> {
        order
            .iter()
            .map(|&(from, to)| {
                self.align_one(features, from, to)
                    .map_err(|e| e.for_pair(from, to))
            })
            .collect()
    }

    fn render(
        &self,
        images: &[OwnedImage],
        anchor: usize,
        transforms: &[Homography],
        layout: CanvasLayout,
    ) -> PanoResult<OwnedImage> {
        let area = layout.area().ok_or(PanoError::InvalidDimensions {
            width: layout.width,
            height: layout.height,
        })?;
        if area > self.cfg.max_canvas_pixels {
            return Err(PanoError::InvalidDimensions {
                width: layout.width,
                height: layout.height,
            });
        }
        let mut canvas = OwnedImage::zeros(layout.width, layout.height)?;
        trace_event!("canvas", width = layout.width, height = layout.height);

        let draw_order = std::iter::once(anchor)
            .chain((0..anchor).rev())
            .chain(anchor + 1..images.len());
        for j in draw_order {
            warp_with_offset(&mut canvas, images[j].view(), &transforms[j], layout.offset)?;
        }
        Ok(canvas)
    }
}

/// Chains pair homographies outward from the anchor.
fn chain_transforms(len: usize, anchor: usize, pairs: &[PairAlignment]) -> Vec<Homography> {
    let mut by_image: Vec<Option<Homography>> = vec![None; len];
    for pair in pairs {
        by_image[pair.from] = Some(pair.homography);
    }
    let mut transforms = vec![Homography::identity(); len];
    for j in (0..anchor).rev() {
        if let Some(h) = by_image[j] {
            transforms[j] = transforms[j + 1].compose(&h);
        }
    }
    for j in anchor + 1..len {
        if let Some(h) = by_image[j] {
            transforms[j] = transforms[j - 1].compose(&h);
        }
    }
    transforms
}

fn check_sequence(images: &[OwnedImage], anchor: usize) -> PanoResult<()> {
    if images.is_empty() {
        return Err(PanoError::InvalidInput("image sequence is empty"));
    }
    if anchor >= images.len() {
        return Err(PanoError::IndexOutOfBounds {
            index: anchor,
            len: images.len(),
            context: "anchor",
        });
    }
    Ok(())
}

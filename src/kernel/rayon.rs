//! Rayon-parallel nearest-neighbour search (feature-gated).
//!
//! Parallelizes over query descriptors; each worker runs the same exhaustive
//! search as the sequential path, so results are identical and in order.

use crate::features::FeatureSet;
use crate::kernel::{two_nearest, DistanceKernel, Neighbors};
use rayon::prelude::*;

/// Query-parallel variant of [`crate::kernel::nearest_all`].
pub fn nearest_all_par<K: DistanceKernel>(query: &FeatureSet, train: &FeatureSet) -> Vec<Neighbors> {
    (0..query.len())
        .into_par_iter()
        .map(|idx| match query.descriptor(idx) {
            Some(desc) => two_nearest::<K>(desc, train),
            None => Neighbors::default(),
        })
        .collect()
}

//! Descriptor distance kernels and nearest-neighbour search.
//!
//! The scalar kernel is the reference. The `simd` feature swaps in an `f32x8`
//! implementation and the `rayon` feature adds a query-parallel search whose
//! output is identical to the sequential one.

use crate::features::FeatureSet;

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Squared Euclidean distance between two descriptors of equal length.
pub trait DistanceKernel {
    /// Returns `sum((a[i] - b[i])^2)`.
    fn l2_sq(a: &[f32], b: &[f32]) -> f32;
}

#[cfg(not(feature = "simd"))]
pub(crate) type DefaultKernel = scalar::L2Scalar;
#[cfg(feature = "simd")]
pub(crate) type DefaultKernel = simd::L2Simd;

/// The two closest train descriptors for one query, as `(index, distance)`.
///
/// Distances are Euclidean (not squared). Ties keep the lower train index.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Neighbors {
    /// Closest train descriptor.
    pub first: Option<(usize, f32)>,
    /// Second closest train descriptor.
    pub second: Option<(usize, f32)>,
}

/// Finds the two nearest train descriptors for `query` by exhaustive search.
pub fn two_nearest<K: DistanceKernel>(query: &[f32], train: &FeatureSet) -> Neighbors {
    let mut first: Option<(usize, f32)> = None;
    let mut second: Option<(usize, f32)> = None;
    for (idx, candidate) in train.descriptors().enumerate() {
        let dist = K::l2_sq(query, candidate);
        match first {
            Some((_, best)) if dist >= best => match second {
                Some((_, runner_up)) if dist >= runner_up => {}
                _ => second = Some((idx, dist)),
            },
            _ => {
                second = first;
                first = Some((idx, dist));
            }
        }
    }
    Neighbors {
        first: first.map(|(idx, d)| (idx, d.sqrt())),
        second: second.map(|(idx, d)| (idx, d.sqrt())),
    }
}

/// Runs [`two_nearest`] for every query descriptor in order.
pub fn nearest_all<K: DistanceKernel>(query: &FeatureSet, train: &FeatureSet) -> Vec<Neighbors> {
    query
        .descriptors()
        .map(|desc| two_nearest::<K>(desc, train))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::scalar::L2Scalar;
    use super::{nearest_all, two_nearest};
    use crate::features::{FeatureSet, Keypoint};

    fn set(descs: &[[f32; 2]]) -> FeatureSet {
        let mut set = FeatureSet::new(2);
        for (i, d) in descs.iter().enumerate() {
            let kp = Keypoint {
                x: i as f32,
                y: 0.0,
                response: 1.0,
                size: 1.0,
            };
            set.push(kp, d).unwrap();
        }
        set
    }

    #[test]
    fn two_nearest_orders_candidates() {
        let train = set(&[[5.0, 0.0], [1.0, 0.0], [3.0, 0.0], [0.0, 4.0]]);
        let nn = two_nearest::<L2Scalar>(&[0.0, 0.0], &train);
        assert_eq!(nn.first, Some((1, 1.0)));
        assert_eq!(nn.second, Some((2, 3.0)));
    }

    #[test]
    fn ties_keep_lower_index() {
        let train = set(&[[1.0, 0.0], [0.0, 1.0]]);
        let nn = two_nearest::<L2Scalar>(&[0.0, 0.0], &train);
        assert_eq!(nn.first.map(|(i, _)| i), Some(0));
        assert_eq!(nn.second.map(|(i, _)| i), Some(1));
    }

    #[test]
    fn single_train_descriptor_has_no_second() {
        let train = set(&[[1.0, 1.0]]);
        let query = set(&[[0.0, 0.0], [1.0, 1.0]]);
        let all = nearest_all::<L2Scalar>(&query, &train);
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|nn| nn.second.is_none()));
        assert_eq!(all[1].first, Some((0, 0.0)));
    }
}

//! Scalar reference kernel for descriptor distances.

use crate::kernel::DistanceKernel;

/// Scalar squared-L2 kernel.
pub struct L2Scalar;

impl DistanceKernel for L2Scalar {
    #[inline]
    fn l2_sq(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| {
                let diff = x - y;
                diff * diff
            })
            .sum()
    }
}

//! SIMD-accelerated descriptor distance using the `wide` crate.
//!
//! The inner loop processes 8 descriptor values at a time using `f32x8`;
//! the tail falls back to scalar accumulation.

use crate::kernel::DistanceKernel;
use wide::f32x8;

const LANES: usize = 8;

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Horizontal sum of f32x8.
#[inline]
fn hsum(v: f32x8) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3] + arr[4] + arr[5] + arr[6] + arr[7]
}

/// SIMD squared-L2 kernel.
pub struct L2Simd;

impl DistanceKernel for L2Simd {
    #[inline]
    fn l2_sq(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        let len = a.len().min(b.len());
        let simd_end = len / LANES * LANES;

        let mut acc = f32x8::ZERO;
        let mut i = 0;
        while i < simd_end {
            let diff = load_f32x8(&a[i..]) - load_f32x8(&b[i..]);
            acc += diff * diff;
            i += LANES;
        }

        let mut tail = 0.0f32;
        for j in simd_end..len {
            let diff = a[j] - b[j];
            tail += diff * diff;
        }
        hsum(acc) + tail
    }
}

use panostitch::lowlevel::patch_descriptor;
use panostitch::{FeatureSet, Homography, ImageView, Keypoint, OwnedImage, PanoError};

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        PanoError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::from_slice(&data, 1, 0).err().unwrap();
    assert_eq!(
        err,
        PanoError::InvalidDimensions {
            width: 1,
            height: 0,
        }
    );
}

#[test]
fn image_view_rejects_invalid_stride() {
    let data = [0u8; 8];

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        PanoError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );
}

#[test]
fn image_view_rejects_small_buffer() {
    let data = [0u8; 3];

    let err = ImageView::new(&data, 2, 2, 2).err().unwrap();
    assert_eq!(err, PanoError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn image_view_roi_matches_expected_values() {
    let data: Vec<u8> = (0u8..16).collect();
    let view = ImageView::from_slice(&data, 4, 4).unwrap();
    assert_eq!(view.stride(), 4);
    assert_eq!(view.as_slice(), data.as_slice());

    let roi = view.roi(1, 1, 2, 2).unwrap();
    assert_eq!(roi.width(), 2);
    assert_eq!(roi.height(), 2);
    assert_eq!(roi.stride(), 4);
    assert_eq!(roi.row(0).unwrap(), &[5u8, 6u8]);
    assert_eq!(roi.row(1).unwrap(), &[9u8, 10u8]);
    assert_eq!(roi.get(0, 0).copied(), Some(5u8));
    assert!(roi.get(2, 0).is_none());

    let err = view.roi(3, 3, 2, 2).err().unwrap();
    assert_eq!(
        err,
        PanoError::RoiOutOfBounds {
            x: 3,
            y: 3,
            width: 2,
            height: 2,
            img_width: 4,
            img_height: 4,
        }
    );
}

#[test]
fn owned_image_copies_strided_roi() {
    let data: Vec<u8> = (0u8..20).collect();
    let view = ImageView::from_slice(&data, 5, 4).unwrap();
    let owned = OwnedImage::from_view(view.roi(1, 2, 3, 2).unwrap()).unwrap();
    assert_eq!(owned.width(), 3);
    assert_eq!(owned.height(), 2);
    assert_eq!(owned.data(), &[11u8, 12, 13, 16, 17, 18]);
    assert_eq!(owned.view().stride(), 3);

    let err = OwnedImage::new(vec![0u8; 5], 3, 2).err().unwrap();
    assert_eq!(err, PanoError::BufferTooSmall { needed: 6, got: 5 });
}

#[test]
fn bilinear_sampling_interpolates_and_rejects_outside() {
    let data = [0u8, 100, 200, 44];
    let view = ImageView::from_slice(&data, 2, 2).unwrap();
    assert_eq!(view.sample_bilinear(0.0, 0.0), Some(0.0));
    assert_eq!(view.sample_bilinear(1.0, 1.0), Some(44.0));
    let mid = view.sample_bilinear(0.5, 0.5).unwrap();
    assert!((mid - 86.0).abs() < 1e-4);
    assert!(view.sample_bilinear(-0.01, 0.0).is_none());
    assert!(view.sample_bilinear(0.0, 1.01).is_none());
    assert!(view.sample_bilinear(f64::NAN, 0.0).is_none());
}

#[test]
fn feature_set_keeps_keypoints_and_descriptors_aligned() {
    let mut set = FeatureSet::new(2);
    let kp = Keypoint {
        x: 3.0,
        y: 4.0,
        response: 1.0,
        size: 2.0,
    };
    set.push(kp, &[0.5, -0.5]).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.descriptor(0), Some(&[0.5f32, -0.5][..]));
    assert_eq!(set.keypoint(0), Some(&kp));
    assert!(set.descriptor(1).is_none());

    let err = set.push(kp, &[1.0]).err().unwrap();
    assert_eq!(err, PanoError::InvalidInput("descriptor length mismatch"));
}

#[test]
fn patch_descriptor_is_zero_mean_unit_norm() {
    let data: Vec<u8> = (0..81).map(|i| ((i * 37) % 251) as u8).collect();
    let view = ImageView::from_slice(&data, 9, 9).unwrap();
    let mut desc = Vec::new();
    assert!(patch_descriptor(view, 4, 4, 2, &mut desc));
    assert_eq!(desc.len(), 25);
    let mean: f32 = desc.iter().sum::<f32>() / desc.len() as f32;
    let norm: f32 = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!(mean.abs() < 1e-5);
    assert!((norm - 1.0).abs() < 1e-4);

    assert!(!patch_descriptor(view, 1, 4, 2, &mut desc));
}

#[test]
fn homography_inverse_round_trip() {
    let h = Homography::from_row_slice(&[0.9, -0.1, 30.0, 0.08, 1.05, -12.0, 3e-4, 1e-4, 1.0]);
    let inv = h.inverse().unwrap();
    for &(x, y) in &[(0.0, 0.0), (120.0, 15.0), (64.0, 200.0)] {
        let [u, v] = h.apply(x, y).unwrap();
        let [bx, by] = inv.apply(u, v).unwrap();
        assert!((bx - x).abs() < 1e-8 && (by - y).abs() < 1e-8);
    }

    let singular = Homography::from_row_slice(&[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0]);
    assert!(singular.inverse().is_none());
}

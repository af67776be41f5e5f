use panostitch::{
    crop, CanvasSizing, HarrisPatchExtractor, Homography, MosaicBuilder, MosaicConfig, OwnedImage,
    PanoError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random texture with every value >= 1 so each written canvas pixel counts
/// as foreground.
fn make_scene(width: usize, height: usize, seed: u64) -> OwnedImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height)
        .map(|_| rng.random_range(1u8..=255))
        .collect();
    OwnedImage::new(data, width, height).unwrap()
}

fn window(scene: &OwnedImage, x0: usize, y0: usize, w: usize, h: usize) -> OwnedImage {
    OwnedImage::from_view(scene.view().roi(x0, y0, w, h).unwrap()).unwrap()
}

/// Three 120x90 windows of a 260x100 scene, each shifted (70, 5) from the last.
fn three_windows() -> (OwnedImage, Vec<OwnedImage>) {
    let scene = make_scene(260, 100, 21);
    let images = vec![
        window(&scene, 0, 0, 120, 90),
        window(&scene, 70, 5, 120, 90),
        window(&scene, 140, 10, 120, 90),
    ];
    (scene, images)
}

#[test]
fn single_image_lands_centered_on_double_canvas() {
    let img = make_scene(41, 30, 3);
    let builder = MosaicBuilder::new(HarrisPatchExtractor::default());
    let canvas = builder.compose(std::slice::from_ref(&img), 0).unwrap();
    assert_eq!((canvas.width(), canvas.height()), (82, 60));

    let (ox, oy) = (82 / 2 - 41 / 2, 60 / 2 - 30 / 2);
    for y in 0..60 {
        for x in 0..82 {
            let inside = (ox..ox + 41).contains(&x) && (oy..oy + 30).contains(&y);
            let expected = if inside {
                *img.view().get(x - ox, y - oy).unwrap()
            } else {
                0
            };
            assert_eq!(*canvas.view().get(x, y).unwrap(), expected, "({x}, {y})");
        }
    }

    let cropped = builder.build(std::slice::from_ref(&img)).unwrap();
    assert_eq!(cropped, img);
}

#[test]
fn three_translated_windows_reassemble_the_scene() {
    let (scene, images) = three_windows();
    let builder = MosaicBuilder::new(HarrisPatchExtractor::default());

    let transforms = builder.transforms(&images, 1).unwrap();
    let expected = [(-70.0, -5.0), (0.0, 0.0), (70.0, 5.0)];
    for (t, (dx, dy)) in transforms.iter().zip(expected) {
        let diff = t.matrix() - Homography::translation(dx, dy).matrix();
        assert!(diff.amax() < 1e-6, "transform {:?}", t.matrix());
    }

    let mosaic = builder.build(&images).unwrap();
    assert!(mosaic.width().abs_diff(120 + 70 + 70) <= 1);
    assert!(mosaic.height().abs_diff(90 + 5 + 5) <= 1);

    // Every written pixel reproduces the scene; uncovered corners stay empty.
    let mut written = 0usize;
    let mut mismatched = 0usize;
    for y in 0..mosaic.height().min(scene.height()) {
        for x in 0..mosaic.width().min(scene.width()) {
            let v = *mosaic.view().get(x, y).unwrap();
            if v == 0 {
                continue;
            }
            written += 1;
            if v != *scene.view().get(x, y).unwrap() {
                mismatched += 1;
            }
        }
    }
    assert!(written > 3 * 120 * 90 / 2);
    assert!(mismatched * 1000 <= written, "{mismatched} of {written} differ");
}

#[test]
fn tight_canvas_matches_generous_canvas_after_crop() {
    let (_, images) = three_windows();
    let generous = MosaicBuilder::new(HarrisPatchExtractor::default());
    let tight = MosaicBuilder::new(HarrisPatchExtractor::default()).with_config(MosaicConfig {
        sizing: CanvasSizing::Tight,
        ..MosaicConfig::default()
    });

    let a = generous.compose(&images, 1).unwrap();
    let b = tight.compose(&images, 1).unwrap();
    assert!(b.width() * b.height() < a.width() * a.height());
    assert_eq!(crop(a.view()).unwrap(), crop(b.view()).unwrap());
}

#[test]
fn anchor_choice_moves_the_canvas_not_the_content() {
    let (_, images) = three_windows();
    let builder = MosaicBuilder::new(HarrisPatchExtractor::default());
    let centered = builder.build(&images).unwrap();
    let detail = builder.compose_detailed(&images, 1).unwrap();
    assert_eq!(detail.pairs.len(), 2);
    assert_eq!((detail.pairs[0].from, detail.pairs[0].to), (0, 1));
    assert_eq!((detail.pairs[1].from, detail.pairs[1].to), (2, 1));
    assert!(detail.pairs.iter().all(|p| p.inliers >= 4 && p.inliers <= p.matches));
    assert_eq!(crop(detail.canvas.view()).unwrap(), centered);
}

#[test]
fn failing_pair_is_reported_with_indices() {
    let (_, mut images) = three_windows();
    images[2] = OwnedImage::new(vec![128u8; 120 * 90], 120, 90).unwrap();
    let builder = MosaicBuilder::new(HarrisPatchExtractor::default());

    let err = builder.compose(&images, 1).unwrap_err();
    match err {
        PanoError::PairFailed { from, to, source } => {
            assert_eq!((from, to), (2, 1));
            assert_eq!(
                *source,
                PanoError::InsufficientCorrespondences { needed: 4, got: 0 }
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn invalid_sequences_are_rejected() {
    let builder = MosaicBuilder::new(HarrisPatchExtractor::default());
    assert!(matches!(
        builder.compose(&[], 0),
        Err(PanoError::InvalidInput(_))
    ));
    assert!(matches!(
        builder.build(&[]),
        Err(PanoError::InvalidInput(_))
    ));

    let (_, images) = three_windows();
    assert_eq!(
        builder.compose(&images, 3),
        Err(PanoError::IndexOutOfBounds {
            index: 3,
            len: 3,
            context: "anchor",
        })
    );
}

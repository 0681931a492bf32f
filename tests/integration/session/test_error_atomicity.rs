//! Failed executions must leave the destination bit-for-bit unchanged.

use roi_preprocess::{
    HasRecoverySuggestion, Layout, PreProcessSession, Precision, ResizeAlgorithm, Retryable, Roi,
    RoiBlob, error::classify,
};

use crate::common;

fn poisoned_dest(precision: Precision, layout: Layout, c: usize, h: usize, w: usize) -> roi_preprocess::BlobRef {
    let dest = common::tensor(precision, layout, c, h, w);
    dest.fill_bytes(0xA5);
    dest
}

#[test]
fn test_shape_mismatch_is_atomic() {
    let src = common::u8_pattern(Layout::NHWC, 3, 16, 16, common::gradient);
    let mut session = PreProcessSession::new();
    session.set_roi_blob(Some(RoiBlob::full(src)));

    let cases = [
        poisoned_dest(Precision::U8, Layout::NHWC, 1, 8, 8),
        poisoned_dest(Precision::FP32, Layout::NCHW, 4, 8, 8),
        poisoned_dest(Precision::FP32, Layout::NCHW, 1, 32, 32),
    ];
    for dest in cases {
        let before = dest.to_bytes();
        let err = session.execute(&dest, ResizeAlgorithm::Bilinear).unwrap_err();
        assert_eq!(err.category(), "shape_mismatch");
        assert!(classify::is_caller_error(&err));
        assert!(!err.is_retryable());
        assert_eq!(dest.to_bytes(), before);
    }
    assert_eq!(session.executions(), 0);
}

#[test]
fn test_crop_without_resize_needs_equal_extent() {
    let src = common::u8_pattern(Layout::NCHW, 1, 8, 8, common::gradient);
    let mut session = PreProcessSession::new();
    session.set_roi_blob(Some(RoiBlob::new(src, Roi::new(1, 1, 4, 4)).unwrap()));

    let wrong = poisoned_dest(Precision::U8, Layout::NCHW, 1, 5, 4);
    let err = session.execute(&wrong, ResizeAlgorithm::NoResize).unwrap_err();
    assert_eq!(err.category(), "shape_mismatch");
    assert!(err.recovery_suggestion().is_some());
    assert!(wrong.to_bytes().iter().all(|&b| b == 0xA5));

    let right = poisoned_dest(Precision::FP32, Layout::NHWC, 1, 4, 4);
    session.execute(&right, ResizeAlgorithm::NoResize).unwrap();
    assert_eq!(right.get::<f32>(0, 0, 0, 0).unwrap(), common::gradient(0, 1, 1) as f32);
}

#[test]
fn test_unsupported_stage_is_atomic() {
    let src = common::u8_pattern(Layout::NHWC, 3, 16, 16, common::gradient);
    let mut session = PreProcessSession::new();
    session.set_roi_blob(Some(RoiBlob::full(src)));

    // Upscale into FP32 runs the resize on FP32 data, which Lanczos3 cannot do.
    let dest = poisoned_dest(Precision::FP32, Layout::NHWC, 3, 32, 32);
    let err = session.execute(&dest, ResizeAlgorithm::Lanczos3).unwrap_err();
    assert_eq!(err.category(), "unsupported_algorithm");
    assert!(dest.to_bytes().iter().all(|&b| b == 0xA5));

    // Downscale runs it on the U8 source and succeeds.
    let dest = poisoned_dest(Precision::FP32, Layout::NCHW, 3, 8, 8);
    session.execute(&dest, ResizeAlgorithm::Lanczos3).unwrap();
}

#[test]
fn test_roi_outside_parent_is_rejected_at_binding() {
    let src = common::tensor(Precision::U8, Layout::NCHW, 1, 8, 8);
    let err = RoiBlob::new(src, Roi::new(4, 4, 5, 1)).unwrap_err();
    assert_eq!(err.category(), "out_of_bounds");
}

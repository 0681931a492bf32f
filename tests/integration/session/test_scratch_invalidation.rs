//! One session, consecutive destinations of different shapes.

use std::sync::Arc;

use roi_preprocess::{
    Layout, PreProcessSession, Precision, ProfilingRegistry, ResizeAlgorithm, RoiBlob, spans,
};

use crate::common;

#[test]
fn test_shape_change_reallocates_scratch() {
    let registry = Arc::new(ProfilingRegistry::new());
    let mut session = PreProcessSession::builder()
        .profiler(registry.clone())
        .build()
        .unwrap();
    let src = common::u8_pattern(Layout::NHWC, 3, 100, 100, common::gradient);
    session.set_roi_blob(Some(RoiBlob::full(src.clone())));

    // Downscale into planar: resize in the source format, then reorder.
    let small = common::tensor(Precision::U8, Layout::NCHW, 3, 50, 50);
    session.execute(&small, ResizeAlgorithm::Nearest).unwrap();
    for c in 0..3 {
        for y in 0..50 {
            for x in 0..50 {
                assert_eq!(
                    small.get::<u8>(0, c, y, x).unwrap(),
                    common::gradient(c, 2 * y, 2 * x),
                    "({c}, {y}, {x})"
                );
            }
        }
    }

    // Upscale: reorder first, then resize. tmp1 changes shape.
    let large = common::tensor(Precision::U8, Layout::NCHW, 3, 200, 200);
    session.execute(&large, ResizeAlgorithm::Bilinear).unwrap();

    // Reference: same-format resize into a fresh tensor, then compare
    // element-wise. Any residue of the 50x50 pass would show up here.
    let reference_nhwc = common::tensor(Precision::U8, Layout::NHWC, 3, 200, 200);
    roi_preprocess::processing::resize(&RoiBlob::full(src), &reference_nhwc, ResizeAlgorithm::Bilinear)
        .unwrap();
    assert_eq!(common::elements::<u8>(&large), common::elements::<u8>(&reference_nhwc));

    let (tmp1, tmp2) = session.scratch_stats();
    assert_eq!(tmp1.reallocations, 2);
    assert_eq!(tmp2.reallocations, 0);

    let report = registry.snapshot();
    let count = |name: &str| report.get(name).map_or(0, |r| r.count);
    assert_eq!(count(spans::PREPROCESSING), 2);
    assert_eq!(count(spans::RESIZE), 2);
    assert_eq!(count(spans::REORDER_AFTER), 1);
    assert_eq!(count(spans::REORDER_BEFORE), 1);
}

#[test]
fn test_same_shape_reuses_scratch() {
    let mut session = PreProcessSession::new();
    let src = common::u8_pattern(Layout::HWC, 3, 32, 32, common::gradient);
    session.set_roi_blob(Some(RoiBlob::full(src)));
    let dest = common::tensor(Precision::FP32, Layout::CHW, 3, 16, 16);

    session.execute(&dest, ResizeAlgorithm::Area).unwrap();
    let first = dest.to_bytes();
    dest.fill_bytes(0);
    session.execute(&dest, ResizeAlgorithm::Area).unwrap();
    assert_eq!(dest.to_bytes(), first);

    let (tmp1, _) = session.scratch_stats();
    assert_eq!(tmp1.reallocations, 1);
    assert_eq!(tmp1.hits, 1);

    session.release_scratch();
    session.execute(&dest, ResizeAlgorithm::Area).unwrap();
    assert_eq!(session.scratch_stats().0.reallocations, 2);
}

#[test]
fn test_mapped_scratch_matches_heap_scratch() {
    let src = common::u8_pattern(Layout::NHWC, 3, 40, 40, common::gradient);
    let run = |config: roi_preprocess::PreprocessConfig| {
        let mut session = PreProcessSession::with_config(config).unwrap();
        session.set_roi_blob(Some(RoiBlob::full(src.clone())));
        let dest = common::tensor(Precision::FP16, Layout::NCHW, 3, 24, 24);
        session.execute_default(&dest).unwrap();
        dest.to_bytes()
    };
    let heap = run(roi_preprocess::PreprocessConfig::default());
    let mapped = run(roi_preprocess::PreprocessConfig {
        mapped_threshold_bytes: Some(1),
        ..Default::default()
    });
    assert_eq!(heap, mapped);
}

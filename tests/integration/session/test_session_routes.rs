//! Session behaviour across states, routes and threads.

use std::sync::Arc;
use std::thread;

use roi_preprocess::{
    Layout, NoopProfiler, PreProcessSession, PreprocessConfig, Precision, ProfilingRegistry,
    ResizeAlgorithm, Roi, RoiBlob, SessionMap, SessionState, spans,
};

use crate::common;

#[test]
fn test_idle_session_does_not_crop() {
    let registry = Arc::new(ProfilingRegistry::new());
    let mut session = PreProcessSession::builder()
        .profiler(registry.clone())
        .build()
        .unwrap();
    let dest = common::u8_pattern(Layout::NCHW, 3, 8, 8, common::gradient);
    let before = dest.to_bytes();

    session.execute(&dest, ResizeAlgorithm::Nearest).unwrap();
    assert_eq!(dest.to_bytes(), before);

    // Binding then clearing returns to the same behaviour.
    let src = common::tensor(Precision::U8, Layout::NCHW, 3, 4, 4);
    session.set_roi_blob(Some(RoiBlob::full(src)));
    session.set_roi_blob(None);
    assert_eq!(session.state(), SessionState::Idle);
    session.execute(&dest, ResizeAlgorithm::Bilinear).unwrap();
    assert_eq!(dest.to_bytes(), before);

    let report = registry.snapshot();
    assert_eq!(report.get(spans::PREPROCESSING).map(|r| r.count), Some(2));
    assert!(report.get(spans::RESIZE).is_none());
}

#[test]
fn test_roi_over_destination_itself() {
    let t = common::u8_pattern(Layout::NHWC, 3, 8, 8, common::gradient);
    let mut session = PreProcessSession::new();
    session.set_roi_blob(Some(RoiBlob::new(t.clone(), Roi::new(4, 4, 4, 4)).unwrap()));
    session.execute(&t, ResizeAlgorithm::Nearest).unwrap();
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(t.get::<u8>(0, 1, y, x).unwrap(), common::gradient(1, 4 + y / 2, 4 + x / 2));
        }
    }
}

#[test]
fn test_disabled_profiling_gives_identical_output() {
    let src = common::u8_pattern(Layout::HWC, 3, 30, 20, common::gradient);
    let run = |profiling: bool| {
        let registry = Arc::new(ProfilingRegistry::new());
        let config = PreprocessConfig {
            profiling,
            ..PreprocessConfig::default()
        };
        let mut session = PreProcessSession::builder()
            .config(config)
            .profiler(registry.clone())
            .roi(RoiBlob::new(src.clone(), Roi::new(3, 5, 12, 17)).unwrap())
            .build()
            .unwrap();
        let dest = common::tensor(Precision::FP32, Layout::NCHW, 3, 9, 11);
        session.execute(&dest, ResizeAlgorithm::Area).unwrap();
        (dest.to_bytes(), registry.snapshot().is_empty())
    };
    let (with, recorded_nothing) = run(true);
    assert!(!recorded_nothing);
    let (without, recorded_nothing) = run(false);
    assert!(recorded_nothing);
    assert_eq!(with, without);
}

#[test]
fn test_noop_sink_through_builder() {
    let src = common::u8_pattern(Layout::NCHW, 1, 4, 4, common::gradient);
    let mut session = PreProcessSession::builder()
        .profiler(Arc::new(NoopProfiler))
        .roi(RoiBlob::full(src))
        .build()
        .unwrap();
    let dest = common::tensor(Precision::U8, Layout::NCHW, 1, 2, 2);
    session.execute(&dest, ResizeAlgorithm::Nearest).unwrap();
    assert_eq!(dest.to_bytes(), vec![
        common::gradient(0, 0, 0),
        common::gradient(0, 0, 2),
        common::gradient(0, 2, 0),
        common::gradient(0, 2, 2),
    ]);
}

#[test]
fn test_independent_sessions_on_threads() {
    let src = common::u8_pattern(Layout::NHWC, 3, 64, 64, common::gradient);
    let mut map = SessionMap::new().with_profiler(Arc::new(NoopProfiler));
    for name in ["left", "right"] {
        let x = if name == "left" { 0 } else { 32 };
        map.session(name)
            .set_roi_blob(Some(RoiBlob::new(src.clone(), Roi::new(x, 0, 32, 64)).unwrap()));
    }

    let mut handles = Vec::new();
    for name in ["left", "right"] {
        let mut session = map.release(name).unwrap();
        handles.push(thread::spawn(move || {
            let dest = common::tensor(Precision::FP32, Layout::NCHW, 3, 32, 16);
            session.execute(&dest, ResizeAlgorithm::Nearest).unwrap();
            dest
        }));
    }
    let outputs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for (dest, x0) in outputs.iter().zip([0usize, 32]) {
        assert_eq!(
            dest.get::<f32>(0, 2, 5, 7).unwrap(),
            common::gradient(2, 10, x0 + 14) as f32
        );
    }
    assert!(map.is_empty());
}

#[test]
fn test_one_shot_preprocess() {
    let src = common::u8_pattern(Layout::NHWC, 1, 6, 6, |_, _, _| 40);
    let dest = common::tensor(Precision::I16, Layout::NCHW, 1, 3, 2);
    roi_preprocess::preprocess(RoiBlob::full(src), &dest, ResizeAlgorithm::Bilinear).unwrap();
    assert!(common::elements::<i16>(&dest).iter().all(|&v| v == 40));
}

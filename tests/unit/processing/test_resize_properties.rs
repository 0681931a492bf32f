//! Unit tests for the resize stage
//!
//! Properties every algorithm must hold for arbitrary extents and content.

use half::f16;
use proptest::prelude::*;
use roi_preprocess::processing::resize;
use roi_preprocess::{Layout, Precision, ResizeAlgorithm, Roi, RoiBlob};
use roi_scale::AxisPlan;

use crate::common;

fn layouts() -> impl Strategy<Value = Layout> {
    prop_oneof![Just(Layout::NCHW), Just(Layout::NHWC), Just(Layout::CHW), Just(Layout::HWC)]
}

proptest! {
    #[test]
    fn nearest_same_extent_is_identity(
        c in 1usize..4, h in 1usize..12, w in 1usize..12,
        seed in any::<u8>(), layout in layouts(),
    ) {
        let src = common::u8_pattern(layout, c, h, w, |ch, y, x| common::gradient(ch, y, x) ^ seed);
        let dst = common::tensor(Precision::U8, layout, c, h, w);
        resize(&RoiBlob::full(src.clone()), &dst, ResizeAlgorithm::Nearest).unwrap();
        prop_assert_eq!(dst.to_bytes(), src.to_bytes());
    }

    #[test]
    fn bilinear_stays_within_blended_neighbourhood(
        values in proptest::collection::vec(-1000.0f32..1000.0, 4..=64),
        dh in 1usize..10, dw in 1usize..10,
    ) {
        let w = 4;
        let h = values.len() / w;
        let src = common::filled::<f32>(Layout::NCHW, 1, h, w, |_, y, x| values[y * w + x]);
        let dst = common::tensor(Precision::FP32, Layout::NCHW, 1, dh, dw);
        resize(&RoiBlob::full(src), &dst, ResizeAlgorithm::Bilinear).unwrap();

        let xs = AxisPlan::bilinear(w, dw);
        let ys = AxisPlan::bilinear(h, dh);
        for y in 0..dh {
            for x in 0..dw {
                let mut lo = f32::INFINITY;
                let mut hi = f32::NEG_INFINITY;
                for ty in ys.taps(y) {
                    for tx in xs.taps(x) {
                        lo = lo.min(values[ty.index * w + tx.index]);
                        hi = hi.max(values[ty.index * w + tx.index]);
                    }
                }
                let v = dst.get::<f32>(0, 0, y, x).unwrap();
                prop_assert!(lo <= v && v <= hi, "({}, {}): {} outside [{}, {}]", y, x, v, lo, hi);
            }
        }
    }

    #[test]
    fn area_downscale_of_uniform_roi_is_uniform(
        value in any::<u8>(),
        h in 2usize..24, w in 2usize..24,
        dh in 1usize..24, dw in 1usize..24,
    ) {
        prop_assume!(dh <= h && dw <= w);
        let parent = common::u8_pattern(Layout::NHWC, 3, h + 2, w + 2, |_, y, x| {
            if (1..=h).contains(&y) && (1..=w).contains(&x) { value } else { value.wrapping_add(77) }
        });
        let roi = RoiBlob::new(parent, Roi::new(1, 1, w, h)).unwrap();
        let dst = common::tensor(Precision::U8, Layout::NCHW, 3, dh, dw);
        resize(&roi, &dst, ResizeAlgorithm::Area).unwrap();
        prop_assert!(dst.to_bytes().iter().all(|&v| v == value));
    }

    #[test]
    fn area_downscale_of_uniform_float_roi_is_exact(
        value in -1000.0f32..1000.0,
        h in 2usize..24, w in 2usize..24,
        dh in 1usize..24, dw in 1usize..24,
        layout in layouts(),
    ) {
        prop_assume!(dh <= h && dw <= w);
        let inside = |y: usize, x: usize| (1..=h).contains(&y) && (1..=w).contains(&x);

        let parent = common::filled::<f32>(layout, 2, h + 2, w + 2, |_, y, x| {
            if inside(y, x) { value } else { value + 50.0 }
        });
        let roi = RoiBlob::new(parent, Roi::new(1, 1, w, h)).unwrap();
        let dst = common::tensor(Precision::FP32, Layout::NCHW, 2, dh, dw);
        resize(&roi, &dst, ResizeAlgorithm::Area).unwrap();
        for v in common::elements::<f32>(&dst) {
            prop_assert_eq!(v, value);
        }

        let half_value = f16::from_f32(value);
        let parent = common::filled::<f16>(layout, 2, h + 2, w + 2, |_, y, x| {
            if inside(y, x) { half_value } else { f16::from_f32(value + 50.0) }
        });
        let roi = RoiBlob::new(parent, Roi::new(1, 1, w, h)).unwrap();
        let dst = common::tensor(Precision::FP16, Layout::NHWC, 2, dh, dw);
        resize(&roi, &dst, ResizeAlgorithm::Area).unwrap();
        for v in common::elements::<f16>(&dst) {
            prop_assert_eq!(v, half_value);
        }
    }

    #[test]
    fn nearest_downscale_by_two_picks_even_pixels(h in 1usize..10, w in 1usize..10) {
        let src = common::u8_pattern(Layout::HWC, 3, 2 * h, 2 * w, common::gradient);
        let dst = common::tensor(Precision::U8, Layout::CHW, 3, h, w);
        resize(&RoiBlob::full(src), &dst, ResizeAlgorithm::Nearest).unwrap();
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    prop_assert_eq!(dst.get::<u8>(0, c, y, x).unwrap(), common::gradient(c, 2 * y, 2 * x));
                }
            }
        }
    }
}

#[test]
fn every_algorithm_copies_equal_extents() {
    let src = common::u8_pattern(Layout::NHWC, 3, 5, 6, common::gradient);
    for algorithm in ResizeAlgorithm::ALL {
        let dst = common::tensor(Precision::U8, Layout::NCHW, 3, 5, 6);
        resize(&RoiBlob::full(src.clone()), &dst, algorithm).unwrap();
        assert_eq!(
            common::elements::<u8>(&dst),
            common::elements::<u8>(&src),
            "{algorithm}"
        );
    }
}

#[test]
fn lanczos_rejects_planar_float() {
    let src = common::tensor(Precision::FP32, Layout::NCHW, 3, 8, 8);
    let dst = common::tensor(Precision::FP32, Layout::NCHW, 3, 4, 4);
    let err = resize(&RoiBlob::full(src), &dst, ResizeAlgorithm::Lanczos3).unwrap_err();
    assert_eq!(err.category(), "unsupported_algorithm");
}

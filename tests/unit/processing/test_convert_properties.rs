//! Unit tests for the layout/precision converter

use proptest::prelude::*;
use roi_preprocess::processing::convert;
use roi_preprocess::{Layout, Precision, RoiBlob};

use crate::common;

const LAYOUTS: [Layout; 4] = [Layout::NCHW, Layout::NHWC, Layout::CHW, Layout::HWC];
const PRECISIONS: [Precision; 7] = [
    Precision::U8,
    Precision::I8,
    Precision::U16,
    Precision::I16,
    Precision::I32,
    Precision::FP16,
    Precision::FP32,
];

proptest! {
    #[test]
    fn layout_round_trip_is_lossless(
        l1 in 0usize..4, l2 in 0usize..4, p in 0usize..7,
        c in 1usize..5, h in 1usize..9, w in 1usize..9,
        bytes in proptest::collection::vec(any::<u8>(), 4 * 4 * 8 * 8),
    ) {
        let (l1, l2, precision) = (LAYOUTS[l1], LAYOUTS[l2], PRECISIONS[p]);
        let a = common::tensor(precision, l1, c, h, w);
        let len = a.byte_len();
        a.write_region(0, &bytes[..len]).unwrap();

        let b = common::tensor(precision, l2, c, h, w);
        let back = common::tensor(precision, l1, c, h, w);
        convert(&RoiBlob::full(a.clone()), &b).unwrap();
        convert(&RoiBlob::full(b), &back).unwrap();
        prop_assert_eq!(back.to_bytes(), a.to_bytes());
    }

    #[test]
    fn widening_u8_is_exact(value in any::<u8>(), p in 0usize..7) {
        let precision = PRECISIONS[p];
        prop_assume!(precision != Precision::I8);
        let src = common::u8_pattern(Layout::NHWC, 1, 1, 1, |_, _, _| value);
        let wide = common::tensor(precision, Layout::NCHW, 1, 1, 1);
        let back = common::tensor(Precision::U8, Layout::NHWC, 1, 1, 1);
        convert(&RoiBlob::full(src.clone()), &wide).unwrap();
        convert(&RoiBlob::full(wide), &back).unwrap();
        prop_assert_eq!(back.to_bytes(), src.to_bytes());
    }
}

#[test]
fn narrowing_saturates_and_rounds_half_away_from_zero() {
    let src = common::filled::<f32>(Layout::NCHW, 1, 1, 6, |_, _, x| [-0.5, 0.5, 1.5, -129.0, 1e9, 2.49][x]);
    let i8s = common::tensor(Precision::I8, Layout::NCHW, 1, 1, 6);
    convert(&RoiBlob::full(src.clone()), &i8s).unwrap();
    assert_eq!(common::elements::<i8>(&i8s), vec![-1, 1, 2, -128, 127, 2]);

    let u16s = common::tensor(Precision::U16, Layout::NCHW, 1, 1, 6);
    convert(&RoiBlob::full(src), &u16s).unwrap();
    assert_eq!(common::elements::<u16>(&u16s), vec![0, 1, 2, 0, u16::MAX, 2]);
}

#[test]
fn fp16_clamps_to_finite_range() {
    let src = common::filled::<f32>(Layout::NCHW, 1, 1, 2, |_, _, x| [1e6, -1e6][x]);
    let dst = common::tensor(Precision::FP16, Layout::NHWC, 1, 1, 2);
    convert(&RoiBlob::full(src), &dst).unwrap();
    let out = common::elements::<half::f16>(&dst);
    assert_eq!(out, vec![half::f16::MAX, -half::f16::MAX]);
}

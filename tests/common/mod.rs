//! Common test utilities and helpers for the preprocessing tests
//!
//! Tensor constructors and fill patterns shared by the unit and integration
//! suites.

#![allow(dead_code)]

use roi_preprocess::{BlobRef, Dims, Element, Layout, Precision, TensorBuffer, TensorDesc};

/// Zeroed tensor with one batch item.
pub fn tensor(precision: Precision, layout: Layout, c: usize, h: usize, w: usize) -> BlobRef {
    let desc = TensorDesc::new(precision, layout, Dims::new(1, c, h, w)).expect("valid desc");
    TensorBuffer::allocate(desc).expect("allocation")
}

/// `U8` tensor where element `(c, h, w)` holds `pattern(c, h, w)`.
pub fn u8_pattern(
    layout: Layout,
    c: usize,
    h: usize,
    w: usize,
    pattern: impl Fn(usize, usize, usize) -> u8,
) -> BlobRef {
    filled::<u8>(layout, c, h, w, pattern)
}

/// Tensor of element type `T` filled by `pattern`.
pub fn filled<T: Element>(
    layout: Layout,
    c: usize,
    h: usize,
    w: usize,
    pattern: impl Fn(usize, usize, usize) -> T,
) -> BlobRef {
    let blob = tensor(T::PRECISION, layout, c, h, w);
    for ch in 0..c {
        for y in 0..h {
            for x in 0..w {
                blob.set::<T>(0, ch, y, x, pattern(ch, y, x)).expect("in bounds");
            }
        }
    }
    blob
}

/// Distinct value per pixel and channel.
pub fn gradient(c: usize, y: usize, x: usize) -> u8 {
    ((c * 83 + y * 7 + x * 3) % 256) as u8
}

/// Every element of `blob` as `T`, in `C, H, W` order.
pub fn elements<T: Element>(blob: &BlobRef) -> Vec<T> {
    let d = blob.dims();
    let mut out = Vec::with_capacity(d.len());
    for n in 0..d.n {
        for c in 0..d.c {
            for h in 0..d.h {
                for w in 0..d.w {
                    out.push(blob.get::<T>(n, c, h, w).expect("in bounds"));
                }
            }
        }
    }
    out
}

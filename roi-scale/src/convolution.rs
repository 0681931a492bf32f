// SPDX-License-Identifier: MIT
// Lanczos3 resize built on fast_image_resize (SIMD-accelerated).
// U8 with 1..=4 interleaved channels; each batch image is staged tightly packed,
// resized, then scattered back into the destination view.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::{U8, U8x2, U8x3, U8x4};
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::cpu;
use crate::error::ScaleError;
use crate::plan::ResizeAlgorithm;
use crate::view::{View, ViewMut};

/// Pre-allocated scratch for packed source and destination images.
#[derive(Debug, Default)]
pub struct Staging {
    src: Vec<u8>,
    dst: Vec<u8>,
}

impl Staging {
    pub fn with_capacity(src: usize, dst: usize) -> Self {
        Self {
            src: Vec::with_capacity(src),
            dst: Vec::with_capacity(dst),
        }
    }

    fn ensure(&mut self, src: usize, dst: usize) {
        if self.src.len() < src {
            self.src.resize(src, 0);
        }
        if self.dst.len() < dst {
            self.dst.resize(dst, 0);
        }
    }

    /// Bytes currently held.
    pub fn capacity(&self) -> usize {
        self.src.capacity() + self.dst.capacity()
    }
}

/// Channel counts the convolution path can pack into one pixel.
pub fn supports_channels(channels: usize) -> bool {
    (1..=4).contains(&channels)
}

fn dim(v: usize) -> Result<u32, ScaleError> {
    u32::try_from(v).map_err(|_| ScaleError::Unsupported {
        algorithm: ResizeAlgorithm::Lanczos3,
        reason: format!("planes wider or taller than {}", u32::MAX),
    })
}

macro_rules! resize_packed {
    ($px:ty, $resizer:expr, $src:expr, $sw:expr, $sh:expr, $dst:expr, $dw:expr, $dh:expr, $opts:expr) => {{
        let src_image = TypedImageRef::<$px>::from_buffer($sw, $sh, $src)?;
        let mut dst_image = TypedImage::<$px>::from_buffer($dw, $dh, $dst)?;
        $resizer.resize_typed::<$px>(&src_image, &mut dst_image, $opts)?;
    }};
}

/// Lanczos3 resize of `src` into the whole of `dst`.
///
/// Equal extents are copied without filtering.
pub fn resize_lanczos3(
    resizer: &mut Resizer,
    src: &View<'_, u8>,
    dst: &mut ViewMut<'_, u8>,
    staging: &mut Staging,
) -> Result<(), ScaleError> {
    let (se, de) = (src.extent(), dst.extent());
    if se.is_empty() || de.is_empty() {
        let extent = if se.is_empty() { se } else { de };
        return Err(ScaleError::EmptyExtent { operation: "lanczos3 resize", extent });
    }
    if se.n != de.n || se.c != de.c {
        return Err(ScaleError::ExtentMismatch { operation: "lanczos3 resize", src: se, dst: de });
    }
    if !supports_channels(se.c) {
        return Err(ScaleError::Unsupported {
            algorithm: ResizeAlgorithm::Lanczos3,
            reason: format!("{} channels", se.c),
        });
    }
    if se == de {
        return cpu::copy(src, dst);
    }

    let (sw, sh, dw, dh) = (dim(se.w)?, dim(se.h)?, dim(de.w)?, dim(de.h)?);
    let c = se.c;
    let src_len = se.h * se.w * c;
    let dst_len = de.h * de.w * c;
    staging.ensure(src_len, dst_len);

    let opts = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .use_alpha(false);

    for n in 0..se.n {
        let packed = &mut staging.src[..src_len];
        for h in 0..se.h {
            for w in 0..se.w {
                for ch in 0..c {
                    packed[(h * se.w + w) * c + ch] = src.at(n, ch, h, w);
                }
            }
        }

        let (packed_src, packed_dst) = (&staging.src[..src_len], &mut staging.dst[..dst_len]);
        match c {
            1 => resize_packed!(U8, resizer, packed_src, sw, sh, packed_dst, dw, dh, &opts),
            2 => resize_packed!(U8x2, resizer, packed_src, sw, sh, packed_dst, dw, dh, &opts),
            3 => resize_packed!(U8x3, resizer, packed_src, sw, sh, packed_dst, dw, dh, &opts),
            _ => resize_packed!(U8x4, resizer, packed_src, sw, sh, packed_dst, dw, dh, &opts),
        }

        for h in 0..de.h {
            for w in 0..de.w {
                for ch in 0..c {
                    dst.set(n, ch, h, w, staging.dst[(h * de.w + w) * c + ch]);
                }
            }
        }
    }
    Ok(())
}

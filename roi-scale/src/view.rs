// SPDX-License-Identifier: MIT
//! Strided 4-D views over flat element slices.
//!
//! Every view addresses elements as `(n, c, h, w)` whatever the memory layout;
//! the layout lives entirely in [`Strides`]. A view carved out of a larger
//! tensor (a region of interest) is the same thing with a non-zero origin and
//! the parent's strides.

use std::fmt;

use crate::error::ScaleError;

/// Logical extent of a view in `N, C, H, W` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    pub n: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
}

impl Extent {
    pub const fn new(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self { n, c, h, w }
    }

    /// Number of addressed elements. Saturates instead of overflowing.
    pub fn len(&self) -> usize {
        self.n
            .saturating_mul(self.c)
            .saturating_mul(self.h)
            .saturating_mul(self.w)
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0 || self.c == 0 || self.h == 0 || self.w == 0
    }

    /// Same batch and channel count with an `h` x `w` plane.
    pub fn with_plane(self, h: usize, w: usize) -> Self {
        Self { h, w, ..self }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}x{}x{}]", self.n, self.c, self.h, self.w)
    }
}

/// Element strides per logical dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Strides {
    pub n: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
}

impl Strides {
    /// Planar, channel-first packing.
    pub fn dense_nchw(e: Extent) -> Self {
        Self {
            w: 1,
            h: e.w,
            c: e.w * e.h,
            n: e.w * e.h * e.c,
        }
    }

    /// Interleaved, channel-last packing.
    pub fn dense_nhwc(e: Extent) -> Self {
        Self {
            c: 1,
            w: e.c,
            h: e.c * e.w,
            n: e.c * e.w * e.h,
        }
    }

    #[inline]
    fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        n * self.n + c * self.c + h * self.h + w * self.w
    }
}

fn check_bounds(
    origin: usize,
    extent: Extent,
    strides: &Strides,
    len: usize,
) -> Result<(), ScaleError> {
    if extent.is_empty() {
        return Ok(());
    }
    let last = strides
        .n
        .checked_mul(extent.n - 1)
        .and_then(|v| v.checked_add(strides.c.checked_mul(extent.c - 1)?))
        .and_then(|v| v.checked_add(strides.h.checked_mul(extent.h - 1)?))
        .and_then(|v| v.checked_add(strides.w.checked_mul(extent.w - 1)?))
        .and_then(|v| v.checked_add(origin));
    match last {
        Some(last) if last < len => Ok(()),
        _ => Err(ScaleError::ViewOutOfBounds {
            extent,
            origin,
            needed: last.map_or(usize::MAX, |l| l + 1),
            len,
        }),
    }
}

/// Read-only strided view.
#[derive(Clone, Copy, Debug)]
pub struct View<'a, T> {
    data: &'a [T],
    origin: usize,
    extent: Extent,
    strides: Strides,
}

impl<'a, T: Copy> View<'a, T> {
    /// Creates a view, checking that every addressed element lies inside `data`.
    pub fn new(
        data: &'a [T],
        origin: usize,
        extent: Extent,
        strides: Strides,
    ) -> Result<Self, ScaleError> {
        check_bounds(origin, extent, &strides, data.len())?;
        Ok(Self {
            data,
            origin,
            extent,
            strides,
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn strides(&self) -> Strides {
        self.strides
    }

    #[inline]
    pub fn at(&self, n: usize, c: usize, h: usize, w: usize) -> T {
        self.data[self.origin + self.strides.offset(n, c, h, w)]
    }
}

/// Mutable strided view.
#[derive(Debug)]
pub struct ViewMut<'a, T> {
    data: &'a mut [T],
    origin: usize,
    extent: Extent,
    strides: Strides,
}

impl<'a, T: Copy> ViewMut<'a, T> {
    /// Creates a view, checking that every addressed element lies inside `data`.
    pub fn new(
        data: &'a mut [T],
        origin: usize,
        extent: Extent,
        strides: Strides,
    ) -> Result<Self, ScaleError> {
        check_bounds(origin, extent, &strides, data.len())?;
        Ok(Self {
            data,
            origin,
            extent,
            strides,
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn strides(&self) -> Strides {
        self.strides
    }

    #[inline]
    pub fn at(&self, n: usize, c: usize, h: usize, w: usize) -> T {
        self.data[self.origin + self.strides.offset(n, c, h, w)]
    }

    #[inline]
    pub fn set(&mut self, n: usize, c: usize, h: usize, w: usize, v: T) {
        let i = self.origin + self.strides.offset(n, c, h, w);
        self.data[i] = v;
    }

    /// Reborrows the view as read-only.
    pub fn as_view(&self) -> View<'_, T> {
        View {
            data: &*self.data,
            origin: self.origin,
            extent: self.extent,
            strides: self.strides,
        }
    }
}

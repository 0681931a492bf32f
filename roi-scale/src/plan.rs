// SPDX-License-Identifier: MIT
//! # Algorithm Selection and Sampling Plans
//!
//! This module turns an algorithm selector plus a source/destination axis length
//! into a list of weighted source taps per destination index. Resampling is
//! separable, so a 2-D resize is fully described by one [`AxisPlan`] for rows and
//! one for columns.
//!
//! ## Edge Policy
//!
//! All plans clamp to the edge of the source region: no tap ever points outside
//! `0..src`. Bilinear and the upscaling branch of area use half-pixel centres,
//! `fx = (x + 0.5) * src / dst - 0.5`, clamped to `[0, src - 1]`.
//!
//! ## Area Footprints
//!
//! When an axis shrinks, destination index `x` back-projects to the interval
//! `[x * s, (x + 1) * s)` with `s = src / dst`. Every source index overlapping
//! that interval contributes with a weight proportional to the overlap length.
//! When an axis grows there is nothing to average, so the axis uses bilinear taps.

use std::fmt;
use std::str::FromStr;

use crate::error::ScaleError;

/// 2-D size in elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: usize,
    pub h: usize,
}

impl Size {
    pub const fn new(w: usize, h: usize) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> usize {
        self.w.saturating_mul(self.h)
    }
}

/// Resize algorithm selector.
///
/// `NoResize` only crops and converts; the region must already have the
/// destination extent. `Lanczos3` is a convolution filter that only runs on
/// interleaved 8-bit data (see [`crate::convolution`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ResizeAlgorithm {
    #[value(name = "none")]
    NoResize,
    Nearest,
    Bilinear,
    Area,
    Lanczos3,
}

impl ResizeAlgorithm {
    pub const ALL: [ResizeAlgorithm; 5] = [
        ResizeAlgorithm::NoResize,
        ResizeAlgorithm::Nearest,
        ResizeAlgorithm::Bilinear,
        ResizeAlgorithm::Area,
        ResizeAlgorithm::Lanczos3,
    ];

    /// Stable numeric code of the selector.
    pub fn code(self) -> u32 {
        match self {
            ResizeAlgorithm::NoResize => 0,
            ResizeAlgorithm::Nearest => 1,
            ResizeAlgorithm::Bilinear => 2,
            ResizeAlgorithm::Area => 3,
            ResizeAlgorithm::Lanczos3 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResizeAlgorithm::NoResize => "none",
            ResizeAlgorithm::Nearest => "nearest",
            ResizeAlgorithm::Bilinear => "bilinear",
            ResizeAlgorithm::Area => "area",
            ResizeAlgorithm::Lanczos3 => "lanczos3",
        }
    }
}

impl fmt::Display for ResizeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResizeAlgorithm {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let key = key.strip_prefix("resize_").unwrap_or(&key);
        match key {
            "none" | "no_resize" => Ok(ResizeAlgorithm::NoResize),
            "nearest" => Ok(ResizeAlgorithm::Nearest),
            "bilinear" | "linear" => Ok(ResizeAlgorithm::Bilinear),
            "area" => Ok(ResizeAlgorithm::Area),
            "lanczos3" | "lanczos" => Ok(ResizeAlgorithm::Lanczos3),
            _ => Err(ScaleError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<u32> for ResizeAlgorithm {
    type Error = ScaleError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        ResizeAlgorithm::ALL
            .into_iter()
            .find(|a| a.code() == code)
            .ok_or_else(|| ScaleError::UnknownAlgorithm(code.to_string()))
    }
}

/// Direction of a resize, judged by the number of spatial elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleDirection {
    /// Same width and height.
    Identity,
    /// Destination has fewer (or as many, reshaped) elements than the source.
    Downscale,
    /// Destination has more elements than the source.
    Upscale,
}

impl ScaleDirection {
    pub fn classify(src: Size, dst: Size) -> Self {
        if src == dst {
            ScaleDirection::Identity
        } else if dst.area() > src.area() {
            ScaleDirection::Upscale
        } else {
            ScaleDirection::Downscale
        }
    }
}

/// One weighted source index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tap {
    pub index: usize,
    pub weight: f32,
}

/// Source taps for every destination index along one axis.
///
/// Stored compressed: the taps of destination index `i` are
/// `taps[offsets[i]..offsets[i + 1]]`, and their weights sum to one.
/// Both axis lengths must be non-zero.
#[derive(Clone, Debug)]
pub struct AxisPlan {
    taps: Vec<Tap>,
    offsets: Vec<usize>,
}

impl AxisPlan {
    fn with_capacity(dst: usize, per_index: usize) -> Self {
        let mut offsets = Vec::with_capacity(dst + 1);
        offsets.push(0);
        Self {
            taps: Vec::with_capacity(dst * per_index),
            offsets,
        }
    }

    fn close_index(&mut self) {
        self.offsets.push(self.taps.len());
    }

    /// Single tap at `floor(x * src / dst)`.
    pub fn nearest(src: usize, dst: usize) -> Self {
        let mut plan = Self::with_capacity(dst, 1);
        for x in 0..dst {
            let index = ((x * src) / dst).min(src - 1);
            plan.taps.push(Tap { index, weight: 1.0 });
            plan.close_index();
        }
        plan
    }

    /// Two taps around the half-pixel centre, clamped to the edge.
    pub fn bilinear(src: usize, dst: usize) -> Self {
        let mut plan = Self::with_capacity(dst, 2);
        let scale = src as f64 / dst as f64;
        let max = (src - 1) as f64;
        for x in 0..dst {
            let fx = ((x as f64 + 0.5) * scale - 0.5).clamp(0.0, max);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(src - 1);
            let frac = (fx - x0 as f64) as f32;
            if x1 == x0 || frac == 0.0 {
                plan.taps.push(Tap { index: x0, weight: 1.0 });
            } else {
                plan.taps.push(Tap { index: x0, weight: 1.0 - frac });
                plan.taps.push(Tap { index: x1, weight: frac });
            }
            plan.close_index();
        }
        plan
    }

    /// Box-filter footprint when shrinking, bilinear taps when growing.
    pub fn area(src: usize, dst: usize) -> Self {
        if dst > src {
            return Self::bilinear(src, dst);
        }
        let scale = src as f64 / dst as f64;
        let mut plan = Self::with_capacity(dst, scale.ceil() as usize + 1);
        for x in 0..dst {
            let start = x as f64 * scale;
            let end = ((x + 1) as f64 * scale).min(src as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src);
            let begin = plan.taps.len();
            let mut total = 0.0f64;
            for i in first..last {
                let overlap = end.min((i + 1) as f64) - start.max(i as f64);
                if overlap > 1e-9 {
                    total += overlap;
                    plan.taps.push(Tap {
                        index: i,
                        weight: overlap as f32,
                    });
                }
            }
            for tap in &mut plan.taps[begin..] {
                tap.weight = (tap.weight as f64 / total) as f32;
            }
            plan.close_index();
        }
        plan
    }

    /// Plan for `algorithm`, or `None` when the algorithm does not resample
    /// through taps.
    pub fn for_algorithm(algorithm: ResizeAlgorithm, src: usize, dst: usize) -> Option<Self> {
        match algorithm {
            ResizeAlgorithm::Nearest => Some(Self::nearest(src, dst)),
            ResizeAlgorithm::Bilinear => Some(Self::bilinear(src, dst)),
            ResizeAlgorithm::Area => Some(Self::area(src, dst)),
            ResizeAlgorithm::NoResize | ResizeAlgorithm::Lanczos3 => None,
        }
    }

    /// Number of destination indices.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn taps(&self, i: usize) -> &[Tap] {
        &self.taps[self.offsets[i]..self.offsets[i + 1]]
    }
}

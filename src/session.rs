//! # Preprocessing Session
//!
//! One session per network input. A session remembers the region of interest
//! the caller bound to the input and, on [`PreProcessSession::execute`], turns
//! that region into the exact extent, layout and precision of the destination
//! tensor.
//!
//! ## States
//!
//! ```text
//!            set_roi_blob(Some)            set_roi_blob(Some)
//!   ┌──────┐ ─────────────────▶ ┌──────────┐ ◀──────┐
//!   │ Idle │                    │ RoiBound │ ───────┘
//!   └──────┘ ◀───────────────── └──────────┘
//!            set_roi_blob(None)
//! ```
//!
//! `execute` while `Idle` is a validated no-op: the destination already holds
//! the full default input and nothing is cropped.
//!
//! ## Routes
//!
//! | Formats | Extents | Route | Spans |
//! |---------|---------|-------|-------|
//! | equal | any | resize into destination | `Resize` |
//! | differ | equal | convert into destination | `Reorder after` |
//! | differ | destination not larger | resize into `tmp1`, convert | `Resize`, `Reorder after` |
//! | differ | destination larger | convert into `tmp1`, resize | `Reorder before`, `Resize` |
//!
//! Converting on the smaller side of the resize keeps the per-element cast
//! count minimal. Every route runs inside a `Preprocessing` span.
//!
//! ## Atomicity
//!
//! Shapes, algorithm support and scratch allocations are all settled before
//! the destination is written, so a failed call leaves it untouched. When the
//! ROI crops the destination itself, the region is first copied into `tmp2`.

use std::collections::HashMap;
use std::sync::Arc;

use roi_scale::{ResizeAlgorithm, ScaleDirection, Size};
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::core::profiling::{self, NoopProfiler, ProfilingRegistry, ProfilingSink, spans};
use crate::core::scratch::{ScratchSlot, ScratchStats};
use crate::core::tensor::{BlobRef, Dims, TensorDesc};
use crate::error::PreprocessResult;
use crate::processing::resize::{validate_extents, validate_support};
use crate::processing::{Region, Resampler, RoiBlob, convert_region};

/// Whether a region of interest is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    RoiBound,
}

/// How one `execute` call moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Layout and precision match: resize straight into the destination.
    Direct,
    /// Same extent, different format: convert straight into the destination.
    ReorderOnly,
    /// Resize into `scratch` (source format), then convert.
    ResizeThenReorder { scratch: TensorDesc },
    /// Convert into `scratch` (destination format), then resize.
    ReorderThenResize { scratch: TensorDesc },
}

/// Validated plan for one call. Building it writes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub route: Route,
    pub algorithm: ResizeAlgorithm,
    pub source_extent: Dims,
    /// Descriptor of the ROI copy taken when the ROI crops the destination.
    pub snapshot: Option<TensorDesc>,
}

impl ExecutionPlan {
    pub fn new(roi: &RoiBlob, dest: &BlobRef, algorithm: ResizeAlgorithm) -> PreprocessResult<Self> {
        let src_desc = roi.parent().desc();
        let dst_desc = dest.desc();
        let (src, dst) = (roi.extent(), dst_desc.dims());
        validate_extents(src, dst, algorithm)?;

        let direction = ScaleDirection::classify(Size::new(src.w, src.h), Size::new(dst.w, dst.h));
        let (route, resize_desc) = if src_desc.same_format(dst_desc) {
            (Route::Direct, *src_desc)
        } else if direction == ScaleDirection::Identity {
            (Route::ReorderOnly, *dst_desc)
        } else if direction == ScaleDirection::Upscale {
            let scratch = dst_desc.with_dims(src)?;
            (Route::ReorderThenResize { scratch }, scratch)
        } else {
            let scratch = src_desc.with_dims(dst)?;
            (Route::ResizeThenReorder { scratch }, scratch)
        };
        validate_support(algorithm, resize_desc.precision(), resize_desc.layout(), src, dst)?;

        let snapshot = if roi.crops(dest) {
            Some(roi.cropped_desc()?)
        } else {
            None
        };
        Ok(Self {
            route,
            algorithm,
            source_extent: src,
            snapshot,
        })
    }
}

/// ROI preprocessing session for one network input.
pub struct PreProcessSession {
    roi: Option<RoiBlob>,
    tmp1: ScratchSlot,
    tmp2: ScratchSlot,
    resampler: Resampler,
    config: PreprocessConfig,
    profiler: Arc<dyn ProfilingSink>,
    executions: u64,
}

impl std::fmt::Debug for PreProcessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreProcessSession")
            .field("state", &self.state())
            .field("roi", &self.roi.as_ref().map(RoiBlob::roi))
            .field("tmp1", &self.tmp1)
            .field("tmp2", &self.tmp2)
            .field("config", &self.config)
            .field("executions", &self.executions)
            .finish()
    }
}

impl Default for PreProcessSession {
    fn default() -> Self {
        Self::from_parts(PreprocessConfig::default(), None)
    }
}

impl PreProcessSession {
    /// Session with default configuration, recording into the global registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> PreProcessSessionBuilder {
        PreProcessSessionBuilder::new()
    }

    /// Validates `config` and creates a session.
    pub fn with_config(config: PreprocessConfig) -> PreprocessResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, None))
    }

    fn from_parts(config: PreprocessConfig, profiler: Option<Arc<dyn ProfilingSink>>) -> Self {
        let profiler: Arc<dyn ProfilingSink> = match (config.profiling, profiler) {
            (false, _) => Arc::new(NoopProfiler),
            (true, Some(p)) => p,
            (true, None) => ProfilingRegistry::global(),
        };
        Self {
            roi: None,
            tmp1: ScratchSlot::new("tmp1"),
            tmp2: ScratchSlot::new("tmp2"),
            resampler: Resampler::new(),
            config,
            profiler,
            executions: 0,
        }
    }

    /// Binds a region of interest, or clears it with `None`.
    pub fn set_roi_blob(&mut self, roi: Option<RoiBlob>) {
        self.roi = roi;
    }

    /// The bound region of interest.
    pub fn roi_blob(&self) -> Option<RoiBlob> {
        self.roi.clone()
    }

    pub fn state(&self) -> SessionState {
        match self.roi {
            Some(_) => SessionState::RoiBound,
            None => SessionState::Idle,
        }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Number of successful `execute` calls.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Reuse counters of `tmp1` and `tmp2`.
    pub fn scratch_stats(&self) -> (ScratchStats, ScratchStats) {
        (self.tmp1.stats(), self.tmp2.stats())
    }

    /// Frees both scratch tensors.
    pub fn release_scratch(&mut self) {
        self.tmp1.clear();
        self.tmp2.clear();
    }

    /// Plan `execute` would follow, without running it. `None` when idle.
    pub fn plan(&self, dest: &BlobRef, algorithm: ResizeAlgorithm) -> PreprocessResult<Option<ExecutionPlan>> {
        self.roi
            .as_ref()
            .map(|roi| ExecutionPlan::new(roi, dest, algorithm))
            .transpose()
    }

    /// Runs `execute` with the configured default algorithm.
    pub fn execute_default(&mut self, dest: &BlobRef) -> PreprocessResult<()> {
        self.execute(dest, self.config.default_algorithm)
    }

    /// Fills `dest` from the bound region of interest.
    pub fn execute(&mut self, dest: &BlobRef, algorithm: ResizeAlgorithm) -> PreprocessResult<()> {
        let profiler = Arc::clone(&self.profiler);
        let sink = profiler.as_ref();
        let _total = profiling::span(sink, spans::PREPROCESSING);

        let Some(roi) = self.roi.clone() else {
            debug!(dest = %dest.desc(), %algorithm, "no roi bound, input left as is");
            self.executions += 1;
            return Ok(());
        };

        let plan = ExecutionPlan::new(&roi, dest, algorithm)?;
        debug!(
            route = ?plan.route,
            %algorithm,
            roi = %roi.roi(),
            src = %roi.parent().desc(),
            dest = %dest.desc(),
            snapshot = plan.snapshot.is_some(),
            "preprocessing"
        );
        let policy = self.config.allocation_policy();

        let (source, region) = match plan.snapshot {
            Some(desc) => {
                let tmp2 = self.tmp2.acquire(&desc, &policy)?;
                convert_region(&roi.parent().read(), roi.region(), &mut tmp2.write())?;
                let full = Region::full(tmp2.desc());
                (tmp2, full)
            }
            None => (Arc::clone(roi.parent()), roi.region()),
        };

        match plan.route {
            Route::Direct => {
                let _s = profiling::span(sink, spans::RESIZE);
                self.resampler
                    .resize(&source.read(), region, &mut dest.write(), algorithm)?;
            }
            Route::ReorderOnly => {
                let _s = profiling::span(sink, spans::REORDER_AFTER);
                convert_region(&source.read(), region, &mut dest.write())?;
            }
            Route::ResizeThenReorder { scratch } => {
                let tmp1 = self.tmp1.acquire(&scratch, &policy)?;
                {
                    let _s = profiling::span(sink, spans::RESIZE);
                    self.resampler
                        .resize(&source.read(), region, &mut tmp1.write(), algorithm)?;
                }
                let _s = profiling::span(sink, spans::REORDER_AFTER);
                convert_region(&tmp1.read(), Region::full(tmp1.desc()), &mut dest.write())?;
            }
            Route::ReorderThenResize { scratch } => {
                let tmp1 = self.tmp1.acquire(&scratch, &policy)?;
                {
                    let _s = profiling::span(sink, spans::REORDER_BEFORE);
                    convert_region(&source.read(), region, &mut tmp1.write())?;
                }
                let _s = profiling::span(sink, spans::RESIZE);
                self.resampler.resize(
                    &tmp1.read(),
                    Region::full(tmp1.desc()),
                    &mut dest.write(),
                    algorithm,
                )?;
            }
        }

        self.executions += 1;
        Ok(())
    }
}

/// Builder for sessions with a custom configuration or profiling sink.
#[derive(Default)]
pub struct PreProcessSessionBuilder {
    config: PreprocessConfig,
    profiler: Option<Arc<dyn ProfilingSink>>,
    roi: Option<RoiBlob>,
}

impl PreProcessSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PreprocessConfig) -> Self {
        self.config = config;
        self
    }

    /// Records spans into `sink` instead of the global registry.
    pub fn profiler(mut self, sink: Arc<dyn ProfilingSink>) -> Self {
        self.profiler = Some(sink);
        self
    }

    /// Starts the session with `roi` already bound.
    pub fn roi(mut self, roi: RoiBlob) -> Self {
        self.roi = Some(roi);
        self
    }

    pub fn build(self) -> PreprocessResult<PreProcessSession> {
        self.config.validate()?;
        let mut session = PreProcessSession::from_parts(self.config, self.profiler);
        session.set_roi_blob(self.roi);
        Ok(session)
    }
}

/// Sessions keyed by network input name. Sessions share nothing but the
/// configuration and profiling sink they were created with.
pub struct SessionMap {
    sessions: HashMap<String, PreProcessSession>,
    config: PreprocessConfig,
    profiler: Option<Arc<dyn ProfilingSink>>,
}

impl Default for SessionMap {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
            config: PreprocessConfig::default(),
            profiler: None,
        }
    }
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PreprocessConfig) -> PreprocessResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Records spans of every session into `sink`.
    pub fn with_profiler(mut self, sink: Arc<dyn ProfilingSink>) -> Self {
        self.profiler = Some(sink);
        self
    }

    /// Session of input `name`, created on first use.
    pub fn session(&mut self, name: &str) -> &mut PreProcessSession {
        let (config, profiler) = (&self.config, &self.profiler);
        self.sessions
            .entry(name.to_string())
            .or_insert_with(|| PreProcessSession::from_parts(config.clone(), profiler.clone()))
    }

    pub fn get(&self, name: &str) -> Option<&PreProcessSession> {
        self.sessions.get(name)
    }

    /// Removes the session of input `name` with its scratch tensors.
    pub fn release(&mut self, name: &str) -> Option<PreProcessSession> {
        self.sessions.remove(name)
    }

    /// Executes the session of input `name`, creating it when missing.
    pub fn execute(&mut self, name: &str, dest: &BlobRef, algorithm: ResizeAlgorithm) -> PreprocessResult<()> {
        self.session(name).execute(dest, algorithm)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }
}

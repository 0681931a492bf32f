//! # Profiling Hook
//!
//! Named timing spans around the stages of a preprocessing call. A session
//! records into an injected [`ProfilingSink`]; the default sink is the
//! process-wide [`ProfilingRegistry`], which aggregates count, total, min and
//! max per span name.
//!
//! ## Spans
//!
//! | Name | Covers |
//! |------|--------|
//! | `Preprocessing` | one whole `execute` call |
//! | `Resize` | the resize stage |
//! | `Reorder before` | layout/precision conversion ahead of an upscale |
//! | `Reorder after` | layout/precision conversion after a downscale |
//!
//! Spans are scoped: [`SpanGuard`] records when it is ended or dropped, so
//! early returns through `?` still close the span. Profiling never changes
//! what a call computes; [`NoopProfiler`] turns it off entirely.
//!
//! ## Recording Path
//!
//! Names are registered under a `RwLock`. The four session span names are
//! registered when the registry is created, so recording them only ever takes
//! the read lock and updates atomics; concurrent sessions and report readers
//! do not serialize on it. A name seen for the first time takes the write lock
//! once.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde_json::json;

/// Span names used by the preprocessing session.
pub mod spans {
    pub const PREPROCESSING: &str = "Preprocessing";
    pub const RESIZE: &str = "Resize";
    pub const REORDER_BEFORE: &str = "Reorder before";
    pub const REORDER_AFTER: &str = "Reorder after";

    pub const ALL: [&str; 4] = [PREPROCESSING, RESIZE, REORDER_BEFORE, REORDER_AFTER];
}

/// Destination for completed spans.
pub trait ProfilingSink: Send + Sync {
    fn record(&self, name: &str, elapsed: Duration);

    /// When `false`, spans skip reading the clock.
    fn enabled(&self) -> bool {
        true
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProfiler;

impl ProfilingSink for NoopProfiler {
    fn record(&self, _name: &str, _elapsed: Duration) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Open span; records into its sink on [`SpanGuard::end`] or on drop.
#[must_use = "a span is recorded when the guard is dropped"]
pub struct SpanGuard<'a> {
    sink: &'a dyn ProfilingSink,
    name: &'static str,
    start: Option<Instant>,
}

/// Opens a span named `name`.
pub fn span<'a>(sink: &'a dyn ProfilingSink, name: &'static str) -> SpanGuard<'a> {
    let start = sink.enabled().then(Instant::now);
    SpanGuard { sink, name, start }
}

impl SpanGuard<'_> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Closes the span and returns its duration, or `None` when profiling is off.
    pub fn end(mut self) -> Option<Duration> {
        self.finish()
    }

    fn finish(&mut self) -> Option<Duration> {
        let elapsed = self.start.take()?.elapsed();
        self.sink.record(self.name, elapsed);
        Some(elapsed)
    }
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[derive(Debug)]
struct SpanStats {
    count: AtomicU64,
    total_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl SpanStats {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
        }
    }

    fn add(&self, ns: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .total_ns
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| Some(t.saturating_add(ns)));
        self.min_ns.fetch_min(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }
}

/// Aggregates spans by name.
#[derive(Debug)]
pub struct ProfilingRegistry {
    entries: RwLock<HashMap<String, Arc<SpanStats>>>,
}

impl Default for ProfilingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfilingRegistry {
    /// Registry with the session span names already registered.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Self::preregistered()),
        }
    }

    fn preregistered() -> HashMap<String, Arc<SpanStats>> {
        spans::ALL
            .iter()
            .map(|name| (name.to_string(), Arc::new(SpanStats::new())))
            .collect()
    }

    /// Process-wide registry.
    pub fn global() -> Arc<ProfilingRegistry> {
        static GLOBAL: OnceLock<Arc<ProfilingRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(ProfilingRegistry::new())).clone()
    }

    fn stats_for(&self, name: &str) -> Arc<SpanStats> {
        if let Some(stats) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return stats.clone();
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(SpanStats::new()))
            .clone()
    }

    /// Copy of the current aggregates.
    pub fn snapshot(&self) -> ProfilingReport {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<SpanSummary> = entries
            .iter()
            .map(|(name, s)| {
                let count = s.count.load(Ordering::Relaxed);
                let total = Duration::from_nanos(s.total_ns.load(Ordering::Relaxed));
                let min = match s.min_ns.load(Ordering::Relaxed) {
                    u64::MAX => Duration::ZERO,
                    ns => Duration::from_nanos(ns),
                };
                SpanSummary {
                    name: name.clone(),
                    count,
                    total,
                    min,
                    max: Duration::from_nanos(s.max_ns.load(Ordering::Relaxed)),
                }
            })
            .filter(|row| row.count > 0)
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        ProfilingReport { rows }
    }

    /// Forgets every span. Session span names stay registered.
    pub fn reset(&self) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Self::preregistered();
    }

    #[cfg(test)]
    fn is_registered(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl ProfilingSink for ProfilingRegistry {
    fn record(&self, name: &str, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.stats_for(name).add(ns);
    }
}

/// Aggregate of one span name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanSummary {
    pub name: String,
    pub count: u64,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl SpanSummary {
    pub fn mean(&self) -> Duration {
        match self.count {
            0 => Duration::ZERO,
            n => self.total / n.min(u32::MAX as u64) as u32,
        }
    }
}

/// Snapshot of a registry, rows sorted by total time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilingReport {
    pub rows: Vec<SpanSummary>,
}

impl ProfilingReport {
    pub fn get(&self, name: &str) -> Option<&SpanSummary> {
        self.rows.iter().find(|r| r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let spans: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "count": r.count,
                    "total_us": r.total.as_secs_f64() * 1e6,
                    "mean_us": r.mean().as_secs_f64() * 1e6,
                    "min_us": r.min.as_secs_f64() * 1e6,
                    "max_us": r.max.as_secs_f64() * 1e6,
                })
            })
            .collect();
        json!({ "spans": spans })
    }
}

impl fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Preprocessing Profile")?;
        writeln!(f, "═════════════════════════════════════════════════════════════════")?;
        writeln!(
            f,
            "{:<16} {:>8} {:>12} {:>12} {:>12}",
            "span", "count", "mean (µs)", "min (µs)", "max (µs)"
        )?;
        writeln!(f, "─────────────────────────────────────────────────────────────────")?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<16} {:>8} {:>12.1} {:>12.1} {:>12.1}",
                r.name,
                r.count,
                r.mean().as_secs_f64() * 1e6,
                r.min.as_secs_f64() * 1e6,
                r.max.as_secs_f64() * 1e6,
            )?;
        }
        Ok(())
    }
}

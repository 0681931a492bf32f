//! # Scratch Buffers
//!
//! A preprocessing session needs intermediate tensors between the resize and
//! reorder stages. Allocating them on every call is wasteful when a network
//! sees the same input shape for millions of calls, so each session keeps one
//! [`ScratchSlot`] per intermediate and reuses the buffer for as long as the
//! requested descriptor stays the same.
//!
//! ```text
//!  acquire(desc) ──▶ cached desc == desc ? ──yes──▶ reuse (hit)
//!                              │
//!                              no
//!                              ▼
//!                   allocate (heap or mapped) ──▶ replace cache (reallocation)
//! ```
//!
//! A reused buffer keeps whatever the previous call wrote. Every stage that
//! writes a scratch tensor overwrites all of it, so stale content is never
//! observable.
//!
//! ## Example
//!
//! ```rust
//! use roi_preprocess::core::scratch::{AllocationPolicy, ScratchSlot};
//! use roi_preprocess::{Dims, Layout, Precision, TensorDesc};
//!
//! let mut slot = ScratchSlot::new("tmp1");
//! let policy = AllocationPolicy::default();
//! let desc = TensorDesc::new(Precision::U8, Layout::NHWC, Dims::new(1, 3, 50, 50)).unwrap();
//!
//! let a = slot.acquire(&desc, &policy).unwrap();
//! let b = slot.acquire(&desc, &policy).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert_eq!(slot.stats().reallocations, 1);
//! ```

use crate::core::tensor::{BlobRef, MAX_TENSOR_BYTES, TensorBuffer, TensorDesc};
use crate::error::PreprocessResult;

/// How scratch tensors get their memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    /// Larger requests fail with `Allocation`.
    pub max_bytes: usize,
    /// Requests of at least this many bytes are memory-mapped instead of heap-allocated.
    pub mapped_threshold: Option<usize>,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_TENSOR_BYTES,
            mapped_threshold: None,
        }
    }
}

impl AllocationPolicy {
    pub fn allocate(&self, desc: TensorDesc) -> PreprocessResult<BlobRef> {
        let bytes = desc.byte_size()?;
        match self.mapped_threshold {
            Some(threshold) if bytes >= threshold => {
                TensorBuffer::allocate_mapped_with_limit(desc, self.max_bytes)
            }
            _ => TensorBuffer::allocate_with_limit(desc, self.max_bytes),
        }
    }
}

/// Reuse counters of one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScratchStats {
    pub hits: u64,
    pub reallocations: u64,
}

/// One cached intermediate tensor, invalidated by descriptor mismatch.
#[derive(Debug)]
pub struct ScratchSlot {
    name: &'static str,
    cached: Option<BlobRef>,
    stats: ScratchStats,
}

impl ScratchSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cached: None,
            stats: ScratchStats::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns a tensor described by exactly `desc`, reusing the cached one
    /// when its descriptor is equal. On allocation failure the previous cache
    /// is kept.
    pub fn acquire(&mut self, desc: &TensorDesc, policy: &AllocationPolicy) -> PreprocessResult<BlobRef> {
        if let Some(blob) = &self.cached {
            if blob.desc() == desc {
                self.stats.hits += 1;
                return Ok(blob.clone());
            }
        }
        let blob = policy.allocate(*desc)?;
        tracing::trace!(slot = self.name, %desc, mapped = blob.is_mapped(), "scratch reallocated");
        self.stats.reallocations += 1;
        self.cached = Some(blob.clone());
        Ok(blob)
    }

    /// Descriptor of the cached tensor, if any.
    pub fn cached_desc(&self) -> Option<TensorDesc> {
        self.cached.as_ref().map(|b| *b.desc())
    }

    pub fn stats(&self) -> ScratchStats {
        self.stats
    }

    /// Drops the cached tensor.
    pub fn clear(&mut self) {
        self.cached = None;
    }
}

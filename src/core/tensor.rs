//! # Tensor Buffer
//!
//! A tensor is one contiguous memory region plus an immutable descriptor:
//! element precision, memory layout and logical dims. Dims are always held in
//! `N, C, H, W` order; the layout only decides the strides.
//!
//! ## Storage
//!
//! ```text
//! ┌──────────────────────┐      ┌───────────────────────────┐
//! │ TensorBuffer (Arc)   │      │ Storage                   │
//! │  desc: TensorDesc    │─────▶│  Heap(Vec<u64>)           │  zero-filled, 8-byte aligned
//! │  storage: RwLock<..> │      │  Mapped(MmapMut)          │  tempfile or external file
//! └──────────────────────┘      └───────────────────────────┘
//! ```
//!
//! Both backings are at least 8-byte aligned, so typed views over any
//! supported precision come straight from `bytemuck` without copying.
//!
//! ## Sharing
//!
//! Buffers are shared through [`BlobRef`]. The content sits behind a
//! `RwLock`: any number of readers, or one writer. A caller that reads and
//! writes the same buffer in one operation must take a snapshot first.

use std::fmt;
use std::fs::File;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use half::f16;
use memmap2::{MmapMut, MmapOptions};
use roi_scale::{Extent, Sample, Strides, View, ViewMut};

use crate::error::{PreprocessError, PreprocessResult};

/// Logical tensor dims in `N, C, H, W` order.
pub type Dims = Extent;

/// Shared handle to a tensor buffer.
pub type BlobRef = Arc<TensorBuffer>;

/// Default upper bound for a single allocation.
pub const MAX_TENSOR_BYTES: usize = isize::MAX as usize;

/// Element precision.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Precision {
    U8,
    I8,
    U16,
    I16,
    I32,
    FP16,
    FP32,
}

impl Precision {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Precision::U8 | Precision::I8 => 1,
            Precision::U16 | Precision::I16 | Precision::FP16 => 2,
            Precision::I32 | Precision::FP32 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Precision::U8 => "U8",
            Precision::I8 => "I8",
            Precision::U16 => "U16",
            Precision::I16 => "I16",
            Precision::I32 => "I32",
            Precision::FP16 => "FP16",
            Precision::FP32 => "FP32",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory layout: the order in which logical dims are laid out in memory.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Layout {
    NCHW,
    NHWC,
    CHW,
    HWC,
}

impl Layout {
    pub const fn rank(self) -> usize {
        match self {
            Layout::NCHW | Layout::NHWC => 4,
            Layout::CHW | Layout::HWC => 3,
        }
    }

    /// Channels innermost.
    pub const fn is_interleaved(self) -> bool {
        matches!(self, Layout::NHWC | Layout::HWC)
    }

    /// Dense strides for `dims` in this layout.
    pub fn strides(self, dims: Dims) -> Strides {
        if self.is_interleaved() {
            Strides::dense_nhwc(dims)
        } else {
            Strides::dense_nchw(dims)
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Layout::NCHW => "NCHW",
            Layout::NHWC => "NHWC",
            Layout::CHW => "CHW",
            Layout::HWC => "HWC",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust element types backing each [`Precision`].
pub trait Element: Sample {
    const PRECISION: Precision;
}

impl Element for u8 {
    const PRECISION: Precision = Precision::U8;
}
impl Element for i8 {
    const PRECISION: Precision = Precision::I8;
}
impl Element for u16 {
    const PRECISION: Precision = Precision::U16;
}
impl Element for i16 {
    const PRECISION: Precision = Precision::I16;
}
impl Element for i32 {
    const PRECISION: Precision = Precision::I32;
}
impl Element for f16 {
    const PRECISION: Precision = Precision::FP16;
}
impl Element for f32 {
    const PRECISION: Precision = Precision::FP32;
}

/// Runs `$body` with `$T` bound to the element type of `$precision`.
///
/// ```rust
/// use roi_preprocess::{dispatch_precision, Precision};
///
/// let size = dispatch_precision!(Precision::FP16, T => std::mem::size_of::<T>());
/// assert_eq!(size, 2);
/// ```
#[macro_export]
macro_rules! dispatch_precision {
    ($precision:expr, $T:ident => $body:expr) => {
        match $precision {
            $crate::Precision::U8 => {
                type $T = u8;
                $body
            }
            $crate::Precision::I8 => {
                type $T = i8;
                $body
            }
            $crate::Precision::U16 => {
                type $T = u16;
                $body
            }
            $crate::Precision::I16 => {
                type $T = i16;
                $body
            }
            $crate::Precision::I32 => {
                type $T = i32;
                $body
            }
            $crate::Precision::FP16 => {
                type $T = $crate::half::f16;
                $body
            }
            $crate::Precision::FP32 => {
                type $T = f32;
                $body
            }
        }
    };
}

/// Immutable tensor descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TensorDesc {
    precision: Precision,
    layout: Layout,
    dims: Dims,
}

impl TensorDesc {
    /// Validates and creates a descriptor. Every dim must be positive and
    /// 3-D layouts require `N == 1`.
    pub fn new(precision: Precision, layout: Layout, dims: Dims) -> PreprocessResult<Self> {
        if dims.is_empty() {
            return Err(PreprocessError::shape_mismatch(
                "tensor descriptor",
                "positive dims",
                dims.to_string(),
            ));
        }
        if layout.rank() == 3 && dims.n != 1 {
            return Err(PreprocessError::shape_mismatch(
                "tensor descriptor",
                format!("N = 1 for {layout}"),
                format!("N = {}", dims.n),
            ));
        }
        Ok(Self {
            precision,
            layout,
            dims,
        })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn strides(&self) -> Strides {
        self.layout.strides(self.dims)
    }

    /// Number of elements, or `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        self.dims
            .n
            .checked_mul(self.dims.c)?
            .checked_mul(self.dims.h)?
            .checked_mul(self.dims.w)
    }

    pub fn byte_size(&self) -> PreprocessResult<usize> {
        self.element_count()
            .and_then(|n| n.checked_mul(self.precision.size()))
            .ok_or_else(|| {
                PreprocessError::allocation(
                    format!("tensor {self}"),
                    usize::MAX,
                    "byte size overflows usize",
                )
            })
    }

    /// Same precision and layout, different dims.
    pub fn with_dims(&self, dims: Dims) -> PreprocessResult<Self> {
        Self::new(self.precision, self.layout, dims)
    }

    /// Same dims, different precision and layout.
    pub fn with_format(&self, precision: Precision, layout: Layout) -> PreprocessResult<Self> {
        Self::new(precision, layout, self.dims)
    }

    /// Layout and precision both equal.
    pub fn same_format(&self, other: &TensorDesc) -> bool {
        self.precision == other.precision && self.layout == other.layout
    }
}

impl fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.precision, self.layout, self.dims)
    }
}

enum Storage {
    /// `len` bytes at the front of an 8-byte aligned allocation.
    Heap { words: Vec<u64>, len: usize },
    Mapped(MmapMut),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Heap { words, len } => &bytemuck::cast_slice(words)[..*len],
            Storage::Mapped(map) => &map[..],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::Heap { words, len } => &mut bytemuck::cast_slice_mut(words)[..*len],
            Storage::Mapped(map) => &mut map[..],
        }
    }
}

/// Owned or mapped tensor memory plus its descriptor.
pub struct TensorBuffer {
    desc: TensorDesc,
    storage: RwLock<Storage>,
}

impl fmt::Debug for TensorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorBuffer")
            .field("desc", &self.desc)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

fn heap_storage(what: &str, bytes: usize) -> PreprocessResult<Storage> {
    let words_len = bytes.div_ceil(8);
    let mut words = Vec::new();
    words
        .try_reserve_exact(words_len)
        .map_err(|e| PreprocessError::allocation(what, bytes, e.to_string()))?;
    words.resize(words_len, 0u64);
    Ok(Storage::Heap { words, len: bytes })
}

impl TensorBuffer {
    /// Zero-filled heap tensor, bounded by [`MAX_TENSOR_BYTES`].
    pub fn allocate(desc: TensorDesc) -> PreprocessResult<BlobRef> {
        Self::allocate_with_limit(desc, MAX_TENSOR_BYTES)
    }

    /// Zero-filled heap tensor; more than `max_bytes` fails with `Allocation`.
    pub fn allocate_with_limit(desc: TensorDesc, max_bytes: usize) -> PreprocessResult<BlobRef> {
        let bytes = checked_size(&desc, max_bytes)?;
        let storage = heap_storage(&format!("tensor {desc}"), bytes)?;
        Ok(Arc::new(Self {
            desc,
            storage: RwLock::new(storage),
        }))
    }

    /// Zero-filled tensor backed by an anonymous temporary file mapping.
    pub fn allocate_mapped(desc: TensorDesc) -> PreprocessResult<BlobRef> {
        Self::allocate_mapped_with_limit(desc, MAX_TENSOR_BYTES)
    }

    pub fn allocate_mapped_with_limit(
        desc: TensorDesc,
        max_bytes: usize,
    ) -> PreprocessResult<BlobRef> {
        let bytes = checked_size(&desc, max_bytes)?;
        let file = tempfile::tempfile()
            .map_err(|e| PreprocessError::io("allocate_mapped", e))?;
        file.set_len(bytes as u64)
            .map_err(|e| PreprocessError::io("allocate_mapped", e))?;
        // The file is private to this process and lives as long as the map.
        let map = unsafe { MmapOptions::new().len(bytes).map_mut(&file) }
            .map_err(|e| PreprocessError::allocation(format!("mapped tensor {desc}"), bytes, e.to_string()))?;
        tracing::trace!(%desc, bytes, "mapped tensor allocated");
        Ok(Arc::new(Self {
            desc,
            storage: RwLock::new(Storage::Mapped(map)),
        }))
    }

    /// Wraps an external raw tensor file opened for reading and writing.
    /// The file length must equal the descriptor's byte size.
    pub fn map_file(desc: TensorDesc, file: &File) -> PreprocessResult<BlobRef> {
        let bytes = desc.byte_size()?;
        let len = file
            .metadata()
            .map_err(|e| PreprocessError::io("map_file", e))?
            .len();
        if len != bytes as u64 {
            return Err(PreprocessError::shape_mismatch(
                "map_file",
                format!("{bytes} bytes for {desc}"),
                format!("{len} bytes"),
            ));
        }
        // Concurrent modification of the file by other processes is the caller's contract.
        let map = unsafe { MmapOptions::new().len(bytes).map_mut(file) }
            .map_err(|e| PreprocessError::io("map_file", e))?;
        Ok(Arc::new(Self {
            desc,
            storage: RwLock::new(Storage::Mapped(map)),
        }))
    }

    /// Copies caller bytes into a new heap tensor.
    pub fn from_bytes(desc: TensorDesc, data: &[u8]) -> PreprocessResult<BlobRef> {
        let bytes = desc.byte_size()?;
        if data.len() != bytes {
            return Err(PreprocessError::shape_mismatch(
                "from_bytes",
                format!("{bytes} bytes for {desc}"),
                format!("{} bytes", data.len()),
            ));
        }
        let mut storage = heap_storage(&format!("tensor {desc}"), bytes)?;
        storage.bytes_mut().copy_from_slice(data);
        Ok(Arc::new(Self {
            desc,
            storage: RwLock::new(storage),
        }))
    }

    /// Typed constructor from a slice of elements.
    pub fn from_elements<T: Element>(
        layout: Layout,
        dims: Dims,
        data: &[T],
    ) -> PreprocessResult<BlobRef> {
        let desc = TensorDesc::new(T::PRECISION, layout, dims)?;
        Self::from_bytes(desc, bytemuck::cast_slice(data))
    }

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    pub fn precision(&self) -> Precision {
        self.desc.precision
    }

    pub fn layout(&self) -> Layout {
        self.desc.layout
    }

    pub fn dims(&self) -> Dims {
        self.desc.dims
    }

    pub fn byte_len(&self) -> usize {
        self.read().bytes().len()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(*self.lock_read(), Storage::Mapped(_))
    }

    fn lock_read(&self) -> RwLockReadGuard<'_, Storage> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_write(&self) -> RwLockWriteGuard<'_, Storage> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared access to the content.
    pub fn read(&self) -> TensorRead<'_> {
        TensorRead {
            desc: &self.desc,
            guard: self.lock_read(),
        }
    }

    /// Exclusive access to the content.
    pub fn write(&self) -> TensorWrite<'_> {
        TensorWrite {
            desc: &self.desc,
            guard: self.lock_write(),
        }
    }

    /// Copies `out.len()` raw bytes starting at `byte_offset`.
    pub fn read_region(&self, byte_offset: usize, out: &mut [u8]) -> PreprocessResult<()> {
        let guard = self.read();
        let src = region(guard.bytes(), byte_offset, out.len())?;
        out.copy_from_slice(src);
        Ok(())
    }

    /// Overwrites raw bytes starting at `byte_offset`. No precision conversion.
    pub fn write_region(&self, byte_offset: usize, data: &[u8]) -> PreprocessResult<()> {
        let mut guard = self.write();
        let bytes = guard.bytes_mut();
        let len = bytes.len();
        let end = byte_offset
            .checked_add(data.len())
            .filter(|&end| end <= len)
            .ok_or_else(|| region_error(byte_offset, data.len(), len))?;
        bytes[byte_offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Element index of `(n, c, h, w)` in this buffer's layout.
    pub fn element_offset(&self, n: usize, c: usize, h: usize, w: usize) -> PreprocessResult<usize> {
        let d = self.desc.dims;
        if n >= d.n || c >= d.c || h >= d.h || w >= d.w {
            return Err(PreprocessError::out_of_bounds(
                "element",
                format!("({n}, {c}, {h}, {w}) outside dims {d}"),
            ));
        }
        let s = self.desc.strides();
        Ok(n * s.n + c * s.c + h * s.h + w * s.w)
    }

    pub fn get<T: Element>(&self, n: usize, c: usize, h: usize, w: usize) -> PreprocessResult<T> {
        let index = self.element_offset(n, c, h, w)?;
        let guard = self.read();
        Ok(guard.typed::<T>()?[index])
    }

    pub fn set<T: Element>(
        &self,
        n: usize,
        c: usize,
        h: usize,
        w: usize,
        value: T,
    ) -> PreprocessResult<()> {
        let index = self.element_offset(n, c, h, w)?;
        let mut guard = self.write();
        guard.typed_mut::<T>()?[index] = value;
        Ok(())
    }

    /// Snapshot of the whole content.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.read().bytes().to_vec()
    }

    /// Sets every byte to `value`.
    pub fn fill_bytes(&self, value: u8) {
        self.write().bytes_mut().fill(value);
    }

    /// Whether two handles point at the same buffer.
    pub fn same_buffer(a: &BlobRef, b: &BlobRef) -> bool {
        Arc::ptr_eq(a, b)
    }
}

fn checked_size(desc: &TensorDesc, max_bytes: usize) -> PreprocessResult<usize> {
    let bytes = desc.byte_size()?;
    if bytes > max_bytes {
        return Err(PreprocessError::allocation(
            format!("tensor {desc}"),
            bytes,
            format!("exceeds limit of {max_bytes} bytes"),
        ));
    }
    Ok(bytes)
}

fn region_error(offset: usize, len: usize, total: usize) -> PreprocessError {
    PreprocessError::out_of_bounds(
        "byte region",
        format!("{len} bytes at offset {offset} exceed buffer of {total} bytes"),
    )
}

fn region(bytes: &[u8], offset: usize, len: usize) -> PreprocessResult<&[u8]> {
    offset
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .map(|end| &bytes[offset..end])
        .ok_or_else(|| region_error(offset, len, bytes.len()))
}

fn precision_check(desc: &TensorDesc, requested: Precision) -> PreprocessResult<()> {
    if desc.precision != requested {
        return Err(PreprocessError::shape_mismatch(
            "typed access",
            desc.precision.name(),
            requested.name(),
        ));
    }
    Ok(())
}

fn cast_error(e: bytemuck::PodCastError) -> PreprocessError {
    PreprocessError::shape_mismatch("typed access", "aligned element storage", format!("{e:?}"))
}

/// Shared borrow of a tensor's content.
pub struct TensorRead<'a> {
    desc: &'a TensorDesc,
    guard: RwLockReadGuard<'a, Storage>,
}

impl<'a> TensorRead<'a> {
    pub fn desc(&self) -> &TensorDesc {
        self.desc
    }

    pub fn bytes(&self) -> &[u8] {
        self.guard.bytes()
    }

    pub fn typed<T: Element>(&self) -> PreprocessResult<&[T]> {
        precision_check(self.desc, T::PRECISION)?;
        bytemuck::try_cast_slice(self.bytes()).map_err(cast_error)
    }

    /// Strided view over the whole tensor.
    pub fn view<T: Element>(&self) -> PreprocessResult<View<'_, T>> {
        self.view_region(0, self.desc.dims)
    }

    /// Strided view of `extent` elements starting at element index `origin`,
    /// using this tensor's strides.
    pub fn view_region<T: Element>(
        &self,
        origin: usize,
        extent: Extent,
    ) -> PreprocessResult<View<'_, T>> {
        Ok(View::new(self.typed::<T>()?, origin, extent, self.desc.strides())?)
    }
}

/// Exclusive borrow of a tensor's content.
pub struct TensorWrite<'a> {
    desc: &'a TensorDesc,
    guard: RwLockWriteGuard<'a, Storage>,
}

impl<'a> TensorWrite<'a> {
    pub fn desc(&self) -> &TensorDesc {
        self.desc
    }

    pub fn bytes(&self) -> &[u8] {
        self.guard.bytes()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.guard.bytes_mut()
    }

    pub fn typed_mut<T: Element>(&mut self) -> PreprocessResult<&mut [T]> {
        precision_check(self.desc, T::PRECISION)?;
        bytemuck::try_cast_slice_mut(self.bytes_mut()).map_err(cast_error)
    }

    /// Mutable strided view over the whole tensor.
    pub fn view_mut<T: Element>(&mut self) -> PreprocessResult<ViewMut<'_, T>> {
        let (dims, strides) = (self.desc.dims, self.desc.strides());
        Ok(ViewMut::new(self.typed_mut::<T>()?, 0, dims, strides)?)
    }
}

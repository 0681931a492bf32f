//! Unit tests for tensor buffers
//!
//! Heap and memory-mapped storage must behave the same through the public
//! accessors.

use std::io::{Read, Seek, SeekFrom};

use roi_preprocess::{
    Dims, Layout, PreProcessSession, Precision, ResizeAlgorithm, RoiBlob, TensorBuffer, TensorDesc,
};

use crate::common;

#[test]
fn test_mapped_file_receives_preprocessed_input() {
    let desc = TensorDesc::new(Precision::U8, Layout::NCHW, Dims::new(1, 1, 2, 2)).unwrap();
    let mut file = tempfile::tempfile().unwrap();
    file.set_len(desc.byte_size().unwrap() as u64).unwrap();
    let dest = TensorBuffer::map_file(desc, &file).unwrap();
    assert!(dest.is_mapped());

    let src = common::u8_pattern(Layout::NHWC, 1, 4, 4, |_, y, x| (y * 4 + x) as u8);
    let mut session = PreProcessSession::new();
    session.set_roi_blob(Some(RoiBlob::full(src)));
    session.execute(&dest, ResizeAlgorithm::Nearest).unwrap();
    drop(dest);

    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes, vec![0, 2, 8, 10]);
}

#[test]
fn test_map_file_rejects_wrong_length() {
    let desc = TensorDesc::new(Precision::FP32, Layout::NCHW, Dims::new(1, 1, 2, 2)).unwrap();
    let file = tempfile::tempfile().unwrap();
    file.set_len(15).unwrap();
    let err = TensorBuffer::map_file(desc, &file).unwrap_err();
    assert_eq!(err.category(), "shape_mismatch");
}

#[test]
fn test_mapped_and_heap_agree() {
    let desc = TensorDesc::new(Precision::FP16, Layout::CHW, Dims::new(1, 3, 5, 7)).unwrap();
    let heap = TensorBuffer::allocate(desc).unwrap();
    let mapped = TensorBuffer::allocate_mapped(desc).unwrap();
    assert!(!heap.is_mapped());
    assert_eq!(heap.byte_len(), mapped.byte_len());
    assert_eq!(mapped.to_bytes(), heap.to_bytes());

    let value = half::f16::from_f32(-3.5);
    heap.set(0, 2, 4, 6, value).unwrap();
    mapped.set(0, 2, 4, 6, value).unwrap();
    assert_eq!(mapped.to_bytes(), heap.to_bytes());
}

#[test]
fn test_allocation_limit() {
    let desc = TensorDesc::new(Precision::I32, Layout::NCHW, Dims::new(1, 1, 4, 4)).unwrap();
    assert!(TensorBuffer::allocate_with_limit(desc, 64).is_ok());
    let err = TensorBuffer::allocate_with_limit(desc, 63).unwrap_err();
    assert_eq!(err.category(), "allocation");
    assert!(TensorBuffer::allocate_mapped_with_limit(desc, 63).is_err());
}

#[test]
fn test_element_access_out_of_bounds() {
    let blob = common::tensor(Precision::U8, Layout::NHWC, 3, 2, 2);
    let err = blob.get::<u8>(0, 3, 0, 0).unwrap_err();
    assert_eq!(err.category(), "out_of_bounds");
    assert!(blob.get::<u16>(0, 0, 0, 0).is_err());
}

use std::sync::Arc;

use super::{FrameLayout, PixelBuffer};
use crate::{
    FrameError,
    pool::{BoundedPool, BufferPool, Pooled},
};

#[test]
fn test_layout_tight_and_aligned() {
    let tight = FrameLayout::aligned(3, 2, 1);
    assert_eq!(tight.row_stride, 12);
    assert!(!tight.is_padded());
    assert_eq!(tight.required_len(), 24);

    let padded = FrameLayout::aligned(3, 2, 16);
    assert_eq!(padded.row_stride, 16);
    assert!(padded.is_padded());
    assert_eq!(padded.required_len(), 32);

    let exact = FrameLayout::aligned(64, 64, 64);
    assert_eq!(exact.row_stride, 256);
}

#[test]
fn test_pixel_buffer_logical_size_within_capacity() {
    let pool: Arc<dyn BufferPool> = Arc::new(BoundedPool::new("pixels", 2));
    let mut pixels = PixelBuffer::new(Pooled::acquire(&pool));

    pixels.ensure_layout(FrameLayout::aligned(64, 32, 64)).unwrap();
    assert_eq!(pixels.as_bytes().len(), 256 * 32);
    assert!(pixels.as_bytes().len() <= pixels.capacity());

    pixels.ensure_layout(FrameLayout::aligned(8, 8, 4)).unwrap();
    assert_eq!(pixels.as_bytes().len(), 32 * 8);
    assert!(pixels.capacity() >= 256 * 32, "storage is kept when large enough");
}

#[test]
fn test_pixel_buffer_rows_skip_padding() {
    let pool: Arc<dyn BufferPool> = Arc::new(BoundedPool::new("pixels", 2));
    let mut pixels = PixelBuffer::new(Pooled::acquire(&pool));
    pixels.ensure_layout(FrameLayout::aligned(1, 2, 8)).unwrap();
    pixels.as_bytes_mut().copy_from_slice(&[1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0]);

    let rows: Vec<&[u8]> = pixels.rows().collect();
    assert_eq!(rows, vec![&[1u8, 2, 3, 4][..], &[5u8, 6, 7, 8][..]]);
}

#[test]
fn test_pixel_buffer_keeps_layout_when_allocation_fails() {
    let pool: Arc<dyn BufferPool> = Arc::new(BoundedPool::new("pixels", 2));
    let mut pixels = PixelBuffer::new(Pooled::acquire(&pool));
    pixels.ensure_layout(FrameLayout::aligned(4, 4, 4)).unwrap();

    let huge = FrameLayout {
        width: u32::MAX,
        height: 1,
        row_stride: usize::MAX,
    };
    let err = pixels.ensure_layout(huge).unwrap_err();
    assert!(matches!(err, FrameError::ResourceAllocation(_)), "{:?}", err);
    assert_eq!(pixels.layout(), FrameLayout::aligned(4, 4, 4));
    assert_eq!(pixels.as_bytes().len(), 64);
}

use std::sync::Arc;

use super::DecodeStage;
use crate::{
    FrameError,
    codec::JpegCodec,
    pool::{BoundedPool, BufferPool},
    testsrc::TestPattern,
};

fn stage_with_pools(row_alignment: usize) -> (DecodeStage, Arc<BoundedPool>, Arc<BoundedPool>) {
    stage_with_codec(JpegCodec::with_row_alignment(row_alignment))
}

fn stage_with_codec(codec: JpegCodec) -> (DecodeStage, Arc<BoundedPool>, Arc<BoundedPool>) {
    let encoded = Arc::new(BoundedPool::new("encoded", 4));
    let pixels = Arc::new(BoundedPool::new("pixels", 4));
    let stage = DecodeStage::new(
        Arc::new(codec),
        encoded.clone() as Arc<dyn BufferPool>,
        pixels.clone() as Arc<dyn BufferPool>,
    );
    (stage, encoded, pixels)
}

#[test]
fn test_decode_synthetic_64x64() -> anyhow::Result<()> {
    let (stage, _, _) = stage_with_pools(4);
    let jpeg = TestPattern::new(64, 64).frame(5)?;

    let frame = stage.decode(1, &jpeg)?;
    let pixels = frame.pixels();
    assert_eq!(pixels.width(), 64);
    assert_eq!(pixels.height(), 64);
    assert!(pixels.row_stride() >= 256);
    assert_eq!(pixels.row_stride() * pixels.height() as usize, pixels.as_bytes().len());
    assert!(pixels.as_bytes().iter().any(|b| *b != 0));
    assert_eq!(frame.seq(), 1);
    Ok(())
}

#[test]
fn test_decoded_length_matches_layout_for_padded_rows() -> anyhow::Result<()> {
    let (stage, _, _) = stage_with_pools(64);
    for (w, h) in [(10u16, 7u16), (33, 5), (64, 64)] {
        let jpeg = TestPattern::new(w, h).frame(0)?;
        let frame = stage.decode(0, &jpeg)?;
        let pixels = frame.pixels();
        assert_eq!(pixels.row_stride() % 64, 0);
        assert_eq!(pixels.row_stride() * h as usize, pixels.as_bytes().len());
        assert!(pixels.as_bytes().len() <= pixels.capacity());
    }
    Ok(())
}

#[test]
fn test_buffers_reused_across_frames() -> anyhow::Result<()> {
    let (stage, encoded, pixels) = stage_with_pools(4);
    let pattern = TestPattern::new(32, 32);
    for i in 0..10 {
        let jpeg = pattern.frame(i)?;
        let frame = stage.decode(i, &jpeg)?;
        drop(frame);
    }
    assert_eq!(encoded.stats().created, 1);
    assert_eq!(pixels.stats().created, 1);
    assert_eq!(pixels.stats().outstanding, 0);
    Ok(())
}

#[test]
fn test_pixel_buffer_replaced_exactly_when_larger_frame_arrives() -> anyhow::Result<()> {
    let (stage, _, _) = stage_with_pools(4);
    let small = stage.decode(0, &TestPattern::new(16, 16).frame(0)?)?;
    assert_eq!(small.pixels().capacity(), 16 * 4 * 16);
    drop(small);

    let large = stage.decode(1, &TestPattern::new(48, 40).frame(0)?)?;
    assert_eq!(large.pixels().capacity(), 48 * 4 * 40);
    drop(large);

    let small_again = stage.decode(2, &TestPattern::new(16, 16).frame(0)?)?;
    assert_eq!(small_again.pixels().capacity(), 48 * 4 * 40);
    Ok(())
}

#[test]
fn test_malformed_payload_keeps_pools_consistent() -> anyhow::Result<()> {
    let (stage, encoded, pixels) = stage_with_pools(4);
    let jpeg = TestPattern::new(24, 24).frame(0)?;

    for bad in [&b"\x00\x01garbage bytes"[..], &jpeg[..2]] {
        let err = stage.decode(9, bad).unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)), "{:?}", err);
    }
    assert_eq!(encoded.stats().outstanding, 0);
    assert_eq!(pixels.stats().outstanding, 0);
    assert_eq!(encoded.stats().idle, 1);

    let frame = stage.decode(10, &jpeg)?;
    assert_eq!(frame.pixels().width(), 24);
    Ok(())
}

#[test]
fn test_frame_cut_mid_scan_is_dropped() -> anyhow::Result<()> {
    let (stage, encoded, pixels) = stage_with_pools(4);
    let jpeg = TestPattern::new(64, 64).frame(7)?;

    let err = stage.decode(1, &jpeg[..jpeg.len() / 2]).unwrap_err();
    assert!(matches!(err, FrameError::Decode(_)), "{:?}", err);
    assert_eq!(encoded.stats().outstanding, 0);
    assert_eq!(pixels.stats().outstanding, 0);

    let frame = stage.decode(2, &jpeg)?;
    assert_eq!(frame.pixels().width(), 64);
    Ok(())
}

#[test]
fn test_frame_over_dimension_limit_is_dropped() -> anyhow::Result<()> {
    let (stage, encoded, pixels) = stage_with_codec(JpegCodec::new().with_max_dimensions(32, 32));

    let err = stage.decode(1, &TestPattern::new(64, 64).frame(0)?).unwrap_err();
    assert!(matches!(err, FrameError::Decode(_)), "{:?}", err);
    assert_eq!(encoded.stats().outstanding, 0);
    assert_eq!(pixels.stats().outstanding, 0);
    assert_eq!(pixels.stats().created, 1);

    let frame = stage.decode(2, &TestPattern::new(32, 32).frame(1)?)?;
    assert_eq!(frame.pixels().capacity(), 32 * 4 * 32);
    Ok(())
}

#[test]
fn test_empty_payload_rejected() {
    let (stage, encoded, _) = stage_with_pools(4);
    assert!(matches!(stage.decode(0, &[]), Err(FrameError::EmptyFrame)));
    assert_eq!(encoded.stats().created, 0);
}

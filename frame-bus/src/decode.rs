use std::sync::Arc;

use crate::{
    codec::FrameCodec,
    context::{self, ExecContext},
    error::{FrameError, FrameResult},
    frame::{DecodedFrame, EncodedFrame, PixelBuffer},
    pool::{BufferPool, Pooled},
};

/// Turns encoded payloads into RGBA frames using pooled buffers.
///
/// Both buffers are pool guards, so every exit path (including codec errors)
/// hands them back.
pub struct DecodeStage {
    codec: Arc<dyn FrameCodec>,
    encoded_pool: Arc<dyn BufferPool>,
    pixel_pool: Arc<dyn BufferPool>,
}

impl DecodeStage {
    pub fn new(
        codec: Arc<dyn FrameCodec>,
        encoded_pool: Arc<dyn BufferPool>,
        pixel_pool: Arc<dyn BufferPool>,
    ) -> Self {
        Self {
            codec,
            encoded_pool,
            pixel_pool,
        }
    }

    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }

    /// Copies `encoded` into a buffer from the encoded pool.
    pub fn stage(&self, seq: u64, encoded: &[u8]) -> FrameResult<EncodedFrame> {
        if encoded.is_empty() {
            return Err(FrameError::EmptyFrame);
        }
        let mut buf = Pooled::acquire(&self.encoded_pool);
        buf.fill_from(encoded)?;
        Ok(EncodedFrame::new(seq, buf))
    }

    pub fn decode_frame(&self, frame: &EncodedFrame) -> FrameResult<DecodedFrame> {
        debug_assert!(
            !context::is_current(ExecContext::Presentation),
            "decode must not run on the presentation context"
        );
        if frame.is_empty() {
            return Err(FrameError::EmptyFrame);
        }

        let mut pixels = PixelBuffer::new(Pooled::acquire(&self.pixel_pool));
        let layout = self.codec.layout(frame.data())?;
        pixels.ensure_layout(layout)?;
        self.codec
            .decode_into(frame.data(), &layout, pixels.as_bytes_mut())?;

        log::trace!(
            "decoded frame {}: {} bytes -> {}",
            frame.seq(),
            frame.len(),
            layout
        );
        Ok(DecodedFrame::new(frame.seq(), pixels))
    }

    pub fn decode(&self, seq: u64, encoded: &[u8]) -> FrameResult<DecodedFrame> {
        let frame = self.stage(seq, encoded)?;
        self.decode_frame(&frame)
    }
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;

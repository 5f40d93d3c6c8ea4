use jpeg_encoder::{ColorType, Encoder};
use zune_core::{colorspace::ColorSpace, options::DecoderOptions};
use zune_jpeg::JpegDecoder;

use crate::{
    error::{FrameError, FrameResult},
    frame::FrameLayout,
};

/// Converts an encoded still image to RGBA.
pub trait FrameCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Reads the natural geometry of `encoded` without decoding pixels.
    fn layout(&self, encoded: &[u8]) -> FrameResult<FrameLayout>;

    /// Writes RGBA pixels for `encoded` into `dest` using `layout`, which must
    /// come from [`FrameCodec::layout`] on the same payload.
    fn decode_into(&self, encoded: &[u8], layout: &FrameLayout, dest: &mut [u8])
    -> FrameResult<()>;
}

/// Largest width or height accepted by default.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

/// JPEG to RGBA8888 through zune-jpeg.
///
/// Decoding is strict: truncated or non-conforming scans are errors rather
/// than partially filled images.
#[derive(Clone, Debug)]
pub struct JpegCodec {
    row_alignment: usize,
    max_width: u32,
    max_height: u32,
}

impl JpegCodec {
    pub fn new() -> Self {
        Self::with_row_alignment(4)
    }

    pub fn with_row_alignment(row_alignment: usize) -> Self {
        Self {
            row_alignment: row_alignment.max(1),
            max_width: DEFAULT_MAX_DIMENSION,
            max_height: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Rejects images wider or taller than the given limits before any
    /// pixel storage is sized for them.
    pub fn with_max_dimensions(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width.max(1);
        self.max_height = max_height.max(1);
        self
    }

    pub fn row_alignment(&self) -> usize {
        self.row_alignment
    }

    pub fn max_dimensions(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }

    fn decoder<'a>(&self, encoded: &'a [u8]) -> JpegDecoder<&'a [u8]> {
        let options = DecoderOptions::default()
            .jpeg_set_out_colorspace(ColorSpace::RGBA)
            .set_strict_mode(true)
            .set_max_width(self.max_width as usize)
            .set_max_height(self.max_height as usize);
        JpegDecoder::new_with_options(encoded, options)
    }

    fn read_headers(&self, decoder: &mut JpegDecoder<&[u8]>) -> FrameResult<(u32, u32)> {
        decoder
            .decode_headers()
            .map_err(|e| FrameError::Decode(format!("jpeg headers: {:?}", e)))?;
        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| FrameError::Decode("jpeg dimensions unavailable".to_string()))?;
        if width == 0 || height == 0 {
            return Err(FrameError::Decode(format!(
                "invalid jpeg size {}x{}",
                width, height
            )));
        }
        let width = u32::try_from(width).map_err(|e| FrameError::Decode(e.to_string()))?;
        let height = u32::try_from(height).map_err(|e| FrameError::Decode(e.to_string()))?;
        if width > self.max_width || height > self.max_height {
            return Err(FrameError::Decode(format!(
                "jpeg {}x{} exceeds limit {}x{}",
                width, height, self.max_width, self.max_height
            )));
        }
        Ok((width, height))
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec for JpegCodec {
    fn name(&self) -> &str {
        "jpeg"
    }

    fn layout(&self, encoded: &[u8]) -> FrameResult<FrameLayout> {
        let mut decoder = self.decoder(encoded);
        let (width, height) = self.read_headers(&mut decoder)?;
        Ok(FrameLayout::aligned(width, height, self.row_alignment))
    }

    fn decode_into(
        &self,
        encoded: &[u8],
        layout: &FrameLayout,
        dest: &mut [u8],
    ) -> FrameResult<()> {
        if dest.len() < layout.required_len() {
            return Err(FrameError::Decode(format!(
                "destination holds {} bytes, {} needs {}",
                dest.len(),
                layout,
                layout.required_len()
            )));
        }

        let mut decoder = self.decoder(encoded);
        let (width, height) = self.read_headers(&mut decoder)?;
        if !layout.same_dimensions(width, height) {
            return Err(FrameError::Decode(format!(
                "jpeg is {}x{}, layout is {}",
                width, height, layout
            )));
        }

        let tight_len = decoder
            .output_buffer_size()
            .ok_or_else(|| FrameError::Decode("jpeg output size unavailable".to_string()))?;
        if tight_len != layout.tight_stride() * height as usize {
            return Err(FrameError::Decode(format!(
                "unexpected rgba output size {}",
                tight_len
            )));
        }
        decoder
            .decode_into(&mut dest[..tight_len])
            .map_err(|e| FrameError::Decode(format!("jpeg decode: {:?}", e)))?;

        if layout.is_padded() {
            spread_rows(dest, layout);
        }
        Ok(())
    }
}

/// Encodes `pixels` (laid out as `color`) to a baseline JPEG.
pub fn encode_jpeg(
    pixels: &[u8],
    width: u16,
    height: u16,
    color: ColorType,
    quality: u8,
) -> anyhow::Result<Vec<u8>> {
    if width == 0 || height == 0 {
        anyhow::bail!("invalid image size {}x{}", width, height);
    }
    let mut out = Vec::new();
    let encoder = Encoder::new(&mut out, quality);
    encoder
        .encode(pixels, width, height, color)
        .map_err(|e| anyhow::anyhow!("jpeg encode {}x{}: {}", width, height, e))?;
    Ok(out)
}

/// Moves tightly packed rows at the start of `buf` to their strided offsets
/// and zeroes the padding. Works backwards so no row is overwritten before it
/// has been moved.
fn spread_rows(buf: &mut [u8], layout: &FrameLayout) {
    let tight = layout.tight_stride();
    let stride = layout.row_stride;
    for y in (0..layout.height as usize).rev() {
        let src = y * tight;
        let dst = y * stride;
        if y > 0 {
            buf.copy_within(src..src + tight, dst);
        }
        buf[dst + tight..dst + stride].fill(0);
    }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;

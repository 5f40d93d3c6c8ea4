//! Synthetic camera: a moving test pattern encoded as JPEG.

use bytes::Bytes;
use jpeg_encoder::ColorType;

use crate::codec::encode_jpeg;

pub const DEFAULT_QUALITY: u8 = 85;

#[derive(Clone, Copy, Debug)]
pub struct TestPattern {
    width: u16,
    height: u16,
    quality: u8,
}

impl TestPattern {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// RGB24 pixels of frame `index`: a colour gradient with a vertical bar
    /// that advances one step per frame.
    pub fn rgb(&self, index: u64) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let bar_width = (w / 8).max(1);
        let bar_x = (index as usize * bar_width) % w.max(1);
        let mut rgb = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                if x >= bar_x && x < bar_x + bar_width {
                    rgb.extend_from_slice(&[255, 255, 255]);
                } else {
                    let r = (x * 255 / w.max(1)) as u8;
                    let g = (y * 255 / h.max(1)) as u8;
                    let b = (index % 256) as u8;
                    rgb.extend_from_slice(&[r, g, b.max(32)]);
                }
            }
        }
        rgb
    }

    pub fn frame(&self, index: u64) -> anyhow::Result<Bytes> {
        let rgb = self.rgb(index);
        let jpeg = encode_jpeg(&rgb, self.width, self.height, ColorType::Rgb, self.quality)?;
        Ok(Bytes::from(jpeg))
    }
}

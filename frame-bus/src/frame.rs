use std::fmt::{Display, Formatter};

use crate::{error::FrameResult, pool::Pooled};

pub const RGBA_BYTES_PER_PIXEL: usize = 4;

/// Natural geometry of a decoded image in RGBA.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, at least `width * 4`.
    pub row_stride: usize,
}

impl FrameLayout {
    /// Layout with rows padded up to a multiple of `row_alignment` bytes.
    pub fn aligned(width: u32, height: u32, row_alignment: usize) -> Self {
        let tight = width as usize * RGBA_BYTES_PER_PIXEL;
        let row_stride = match row_alignment {
            0 | 1 => tight,
            align => tight.div_ceil(align) * align,
        };
        Self {
            width,
            height,
            row_stride,
        }
    }

    pub fn tight_stride(&self) -> usize {
        self.width as usize * RGBA_BYTES_PER_PIXEL
    }

    pub fn required_len(&self) -> usize {
        self.row_stride * self.height as usize
    }

    pub fn is_padded(&self) -> bool {
        self.row_stride > self.tight_stride()
    }

    pub fn same_dimensions(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

impl Display for FrameLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}x{} (stride {})",
            self.width, self.height, self.row_stride
        )
    }
}

/// Copy of one received payload, held in a buffer from the encoded pool.
#[derive(Debug)]
pub struct EncodedFrame {
    seq: u64,
    data: Pooled,
}

impl EncodedFrame {
    pub fn new(seq: u64, data: Pooled) -> Self {
        Self { seq, data }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// RGBA pixels in a buffer from the pixel pool.
#[derive(Debug)]
pub struct PixelBuffer {
    data: Pooled,
    layout: FrameLayout,
}

impl PixelBuffer {
    pub fn new(data: Pooled) -> Self {
        Self {
            data,
            layout: FrameLayout {
                width: 0,
                height: 0,
                row_stride: 0,
            },
        }
    }

    /// Sizes the buffer for `layout`. Storage smaller than the layout needs
    /// is replaced with an exact-fit allocation. The previous layout stays in
    /// effect if that allocation fails.
    pub fn ensure_layout(&mut self, layout: FrameLayout) -> FrameResult<()> {
        let required = layout.required_len();
        if self.data.capacity() < required {
            log::debug!(
                "recreating pixel buffer: capacity {} required {}",
                self.data.capacity(),
                required
            );
        }
        self.data.resize_exact(required)?;
        self.layout = layout;
        Ok(())
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width
    }

    pub fn height(&self) -> u32 {
        self.layout.height
    }

    pub fn row_stride(&self) -> usize {
        self.layout.row_stride
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Logical contents, `row_stride * height` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.layout.required_len()]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.layout.required_len();
        &mut self.data[..len]
    }

    /// Visible pixels of row `y`, without padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.layout.row_stride;
        &self.data[start..start + self.layout.tight_stride()]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.layout.height).map(move |y| self.row(y))
    }
}

/// Output of the decode stage. Dropping it returns its pixel buffer.
#[derive(Debug)]
pub struct DecodedFrame {
    seq: u64,
    pixels: PixelBuffer,
}

impl DecodedFrame {
    pub fn new(seq: u64, pixels: PixelBuffer) -> Self {
        Self { seq, pixels }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn layout(&self) -> FrameLayout {
        self.pixels.layout()
    }
}

impl Display for DecodedFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "DecodedFrame {{ seq: {}, {} }}", self.seq, self.layout())
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;

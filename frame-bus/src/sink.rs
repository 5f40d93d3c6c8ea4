use std::{fmt, sync::Arc};

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::{
    error::{FrameError, FrameResult},
    frame::{DecodedFrame, RGBA_BYTES_PER_PIXEL},
    pool::try_alloc_exact,
};

/// Presentation target owning at most one image resource.
///
/// Uploads go to the current resource; nothing becomes visible until
/// [`DisplaySink::swap_visible`].
pub trait DisplaySink: Send {
    /// Size of the current resource, `None` before the first one exists.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Replaces the current resource with one of exactly `width` x `height`.
    /// On failure the previous resource and the visible image are untouched.
    fn ensure_resource(&mut self, width: u32, height: u32) -> FrameResult<()>;

    fn upload(&mut self, frame: &DecodedFrame) -> FrameResult<()>;

    fn swap_visible(&mut self);
}

/// Tightly packed RGBA image.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub seq: u64,
    pub data: Vec<u8>,
}

impl Texture {
    fn alloc(width: u32, height: u32) -> FrameResult<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(RGBA_BYTES_PER_PIXEL))
            .ok_or_else(|| {
                FrameError::ResourceAllocation(format!("{}x{} texture too large", width, height))
            })?;
        let mut data = try_alloc_exact(len)?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            seq: 0,
            data,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * RGBA_BYTES_PER_PIXEL;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("seq", &self.seq)
            .finish()
    }
}

/// Receiving side of the images a [`MemorySink`] has made visible.
#[derive(Clone, Debug)]
pub struct VisibleFrames {
    rx: watch::Receiver<Option<Arc<Texture>>>,
}

impl VisibleFrames {
    pub fn current(&self) -> Option<Arc<Texture>> {
        self.rx.borrow().clone()
    }

    /// Every image made visible from now on. Intermediate images may be
    /// skipped by slow consumers.
    pub fn stream(&self) -> impl Stream<Item = Arc<Texture>> + Send + 'static {
        WatchStream::from_changes(self.rx.clone()).filter_map(|tex| async move { tex })
    }

    /// Waits until an image with sequence number `seq` or later is visible.
    pub async fn wait_for_seq(&mut self, seq: u64) -> FrameResult<Arc<Texture>> {
        let tex = self
            .rx
            .wait_for(|tex| tex.as_ref().is_some_and(|t| t.seq >= seq))
            .await
            .map_err(|_| FrameError::Closed)?;
        tex.clone().ok_or(FrameError::Closed)
    }
}

/// Headless sink keeping the visible image in memory.
///
/// Double buffered: uploads go to a back texture that is published on swap.
/// The texture it replaces becomes the next back buffer once no reader holds
/// it, so steady-state presentation does not allocate.
pub struct MemorySink {
    size: Option<(u32, u32)>,
    back: Option<Texture>,
    visible_tx: watch::Sender<Option<Arc<Texture>>>,
    max_pixels: Option<u64>,
    created: u64,
    destroyed: u64,
    allocations: u64,
}

impl MemorySink {
    pub fn new() -> Self {
        let (visible_tx, _) = watch::channel(None);
        Self {
            size: None,
            back: None,
            visible_tx,
            max_pixels: None,
            created: 0,
            destroyed: 0,
            allocations: 0,
        }
    }

    /// Refuses resources larger than `max_pixels`.
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = Some(max_pixels);
        self
    }

    pub fn visible(&self) -> VisibleFrames {
        VisibleFrames {
            rx: self.visible_tx.subscribe(),
        }
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    /// Texture buffers allocated so far, including back buffers.
    pub fn texture_allocations(&self) -> u64 {
        self.allocations
    }

    fn alloc_texture(&mut self, width: u32, height: u32) -> FrameResult<Texture> {
        let texture = Texture::alloc(width, height)?;
        self.allocations += 1;
        Ok(texture)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for MemorySink {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn ensure_resource(&mut self, width: u32, height: u32) -> FrameResult<()> {
        let pixels = width as u64 * height as u64;
        if width == 0 || height == 0 || self.max_pixels.is_some_and(|max| pixels > max) {
            return Err(FrameError::ResourceAllocation(format!(
                "cannot allocate {}x{} texture",
                width, height
            )));
        }

        let texture = self.alloc_texture(width, height)?;
        if let Some((old_width, old_height)) = self.size.replace((width, height)) {
            log::debug!(
                "texture {}x{} replaced by {}x{}",
                old_width,
                old_height,
                width,
                height
            );
            self.destroyed += 1;
        }
        self.back = Some(texture);
        self.created += 1;
        Ok(())
    }

    fn upload(&mut self, frame: &DecodedFrame) -> FrameResult<()> {
        let pixels = frame.pixels();
        let (width, height) = (pixels.width(), pixels.height());
        if self.size != Some((width, height)) {
            return Err(FrameError::ResourceAllocation(format!(
                "no {}x{} texture to upload into",
                width, height
            )));
        }

        let texture = match self.back.take() {
            Some(texture) => texture,
            None => self.alloc_texture(width, height)?,
        };
        let texture = self.back.insert(texture);
        let row_len = pixels.layout().tight_stride();
        for (dst, src) in texture.data.chunks_exact_mut(row_len).zip(pixels.rows()) {
            dst.copy_from_slice(src);
        }
        texture.seq = frame.seq();
        Ok(())
    }

    fn swap_visible(&mut self) {
        let Some(back) = self.back.take() else {
            return;
        };
        let (width, height) = (back.width, back.height);
        let previous = self.visible_tx.send_replace(Some(Arc::new(back)));
        self.back = previous
            .and_then(|texture| Arc::try_unwrap(texture).ok())
            .filter(|texture| texture.width == width && texture.height == height);
    }
}

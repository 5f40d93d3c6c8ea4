use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;

use crate::error::{FrameError, FrameResult};

pub const DEFAULT_POOL_MAX_SIZE: usize = 10;

/// Source of reusable byte buffers.
///
/// A buffer handed out by [`BufferPool::acquire`] is owned by the caller until
/// it is moved back through [`BufferPool::release`]; ownership rules out two
/// holders of the same buffer.
pub trait BufferPool: Send + Sync {
    fn acquire(&self) -> Vec<u8>;

    fn release(&self, buf: Vec<u8>) -> FrameResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub idle: usize,
    pub outstanding: usize,
    pub created: u64,
    pub discarded: u64,
}

struct PoolState {
    idle: Vec<Vec<u8>>,
    outstanding: usize,
    created: u64,
    discarded: u64,
}

/// Pool keeping at most `max_size` idle buffers. Buffers released while the
/// idle set is full are freed.
pub struct BoundedPool {
    name: &'static str,
    max_size: usize,
    state: Mutex<PoolState>,
}

impl BoundedPool {
    pub fn new(name: &'static str, max_size: usize) -> Self {
        Self {
            name,
            max_size,
            state: Mutex::new(PoolState {
                idle: Vec::with_capacity(max_size),
                outstanding: 0,
                created: 0,
                discarded: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            idle: state.idle.len(),
            outstanding: state.outstanding,
            created: state.created,
            discarded: state.discarded,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BoundedPool {
    fn default() -> Self {
        Self::new("default", DEFAULT_POOL_MAX_SIZE)
    }
}

impl fmt::Debug for BoundedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedPool")
            .field("name", &self.name)
            .field("max_size", &self.max_size)
            .field("stats", &self.stats())
            .finish()
    }
}

impl BufferPool for BoundedPool {
    fn acquire(&self) -> Vec<u8> {
        let mut state = self.lock();
        state.outstanding += 1;
        match state.idle.pop() {
            Some(buf) => buf,
            None => {
                state.created += 1;
                Vec::new()
            }
        }
    }

    fn release(&self, mut buf: Vec<u8>) -> FrameResult<()> {
        let mut state = self.lock();
        if state.outstanding == 0 {
            drop(state);
            let msg = format!("{} pool: release without a matching acquire", self.name);
            debug_assert!(false, "{}", msg);
            log::error!("{}", msg);
            return Err(FrameError::Misuse(msg));
        }
        state.outstanding -= 1;

        if state.idle.len() >= self.max_size {
            state.discarded += 1;
            return Ok(());
        }
        buf.clear();
        state.idle.push(buf);
        Ok(())
    }
}

/// Empty buffer with room for exactly `len` bytes. Allocation failure is
/// reported instead of aborting.
pub fn try_alloc_exact(len: usize) -> FrameResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        FrameError::ResourceAllocation(format!("cannot allocate {} bytes: {}", len, e))
    })?;
    Ok(buf)
}

/// A buffer checked out of a pool, released when dropped.
pub struct Pooled {
    buf: Option<Vec<u8>>,
    pool: Arc<dyn BufferPool>,
}

impl Pooled {
    pub fn acquire(pool: &Arc<dyn BufferPool>) -> Self {
        Self {
            buf: Some(pool.acquire()),
            pool: Arc::clone(pool),
        }
    }

    /// Copies `src` in, replacing the storage with an exact-fit allocation
    /// when the current one is too small. Storage never shrinks.
    pub fn fill_from(&mut self, src: &[u8]) -> FrameResult<()> {
        let buf = self.inner_mut();
        if buf.capacity() < src.len() {
            *buf = try_alloc_exact(src.len())?;
        }
        buf.clear();
        buf.extend_from_slice(src);
        Ok(())
    }

    /// Makes the buffer `len` bytes long. Storage that is too small is
    /// replaced by a zeroed exact-fit allocation instead of grown in place.
    /// On failure the current storage is kept.
    pub fn resize_exact(&mut self, len: usize) -> FrameResult<()> {
        let buf = self.inner_mut();
        if buf.capacity() < len {
            let mut fresh = try_alloc_exact(len)?;
            fresh.resize(len, 0);
            *buf = fresh;
        } else {
            buf.resize(len, 0);
        }
        Ok(())
    }

    fn inner_mut(&mut self) -> &mut Vec<u8> {
        self.buf.get_or_insert_with(Vec::new)
    }
}

impl Deref for Pooled {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        static EMPTY: Vec<u8> = Vec::new();
        self.buf.as_ref().unwrap_or(&EMPTY)
    }
}

impl DerefMut for Pooled {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner_mut()
    }
}

impl Drop for Pooled {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            if let Err(e) = self.pool.release(buf) {
                log::error!("pooled buffer release error: {}", e);
            }
        }
    }
}

impl fmt::Debug for Pooled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;

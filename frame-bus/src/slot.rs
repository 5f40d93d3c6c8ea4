//! Capacity-one, latest-wins handoff between the ingress callback and the
//! decode context.
//!
//! The slot owns a single staging buffer. Writers copy into it under the lock;
//! a write that lands before the previous payload was taken replaces it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::{
    error::{FrameError, FrameResult},
    pool::try_alloc_exact,
};

struct SlotState {
    buf: Vec<u8>,
    seq: u64,
    pending: bool,
    closed: bool,
}

struct Shared {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }
}

/// Result of a successful write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotWrite {
    pub seq: u64,
    /// A payload that had not been taken yet was overwritten.
    pub replaced: bool,
}

pub fn frame_slot() -> (FrameSlotSender, FrameSlotReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(SlotState {
            buf: Vec::new(),
            seq: 0,
            pending: false,
            closed: false,
        }),
        notify: Notify::new(),
    });
    (
        FrameSlotSender {
            shared: Arc::clone(&shared),
        },
        FrameSlotReceiver { shared },
    )
}

#[derive(Clone)]
pub struct FrameSlotSender {
    shared: Arc<Shared>,
}

impl FrameSlotSender {
    /// Copies `payload` into the staging buffer and wakes the receiver.
    pub fn send(&self, payload: &[u8]) -> FrameResult<SlotWrite> {
        if payload.is_empty() {
            return Err(FrameError::EmptyFrame);
        }

        let write = {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(FrameError::Closed);
            }
            if state.buf.capacity() < payload.len() {
                state.buf = try_alloc_exact(payload.len())?;
            }
            state.buf.clear();
            state.buf.extend_from_slice(payload);
            state.seq += 1;
            let replaced = state.pending;
            state.pending = true;
            SlotWrite {
                seq: state.seq,
                replaced,
            }
        };

        self.shared.notify.notify_one();
        Ok(write)
    }

    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn staging_capacity(&self) -> usize {
        self.shared.lock().buf.capacity()
    }
}

pub struct FrameSlotReceiver {
    shared: Arc<Shared>,
}

impl FrameSlotReceiver {
    /// Waits until a payload is pending. Fails with [`FrameError::Closed`]
    /// once the slot is closed and drained.
    pub async fn changed(&self) -> FrameResult<()> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let state = self.shared.lock();
                if state.pending {
                    return Ok(());
                }
                if state.closed {
                    return Err(FrameError::Closed);
                }
            }
            notified.await;
        }
    }

    /// Hands the pending payload to `f` while holding the lock, marking it
    /// taken. `f` should only copy.
    pub fn take_with<R>(&self, f: impl FnOnce(u64, &[u8]) -> R) -> Option<R> {
        let mut state = self.shared.lock();
        if !state.pending {
            return None;
        }
        state.pending = false;
        Some(f(state.seq, &state.buf))
    }

    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for FrameSlotReceiver {
    fn drop(&mut self) {
        self.shared.close();
    }
}

#[cfg(test)]
#[path = "slot_test.rs"]
mod slot_test;

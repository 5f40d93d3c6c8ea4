//! Decode-and-present pipeline for streams of encoded camera frames.
//!
//! Data flow:
//! ```text
//!  on_frame_received ──► FrameSlot (latest wins) ──► DecodeStage ──► mpsc ──► PresentStage ──► DisplaySink
//!     (any thread)           lock held for copy        (worker)               (presentation)
//!                                                         │                          │
//!                                              encoded/pixel BoundedPool ◄── DecodedFrame dropped
//! ```

pub mod codec;
pub mod context;
pub mod decode;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod pool;
pub mod present;
pub mod sink;
pub mod slot;
pub mod stats;
pub mod testsrc;

pub use error::{FrameError, FrameResult};

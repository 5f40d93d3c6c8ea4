use thiserror::Error;

pub type FrameResult<T> = Result<T, FrameError>;

#[derive(Debug, Clone, Error)]
pub enum FrameError {
    /// Upstream delivery could not be set up. Fatal at startup.
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("empty encoded frame")]
    EmptyFrame,
    /// Malformed or truncated payload. Only the offending frame is dropped.
    #[error("decode failure: {0}")]
    Decode(String),
    #[error("resource allocation failure: {0}")]
    ResourceAllocation(String),
    /// Pool contract violation, e.g. releasing more buffers than were acquired.
    #[error("buffer pool misuse: {0}")]
    Misuse(String),
    #[error("worker task failed: {0}")]
    Worker(String),
    #[error("pipeline closed")]
    Closed,
}

impl FrameError {
    /// Errors that only cost the current frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::EmptyFrame | FrameError::Decode(_) | FrameError::ResourceAllocation(_)
        )
    }
}

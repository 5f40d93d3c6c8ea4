//! Execution contexts a pipeline task is declared to run on.
//!
//! Decode work is entered through [`run_on_worker`], presentation work through
//! [`presentation`]. Stages check [`current`] in debug builds.

use std::{fmt, future::Future};

use crate::error::{FrameError, FrameResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecContext {
    /// Blocking worker pool, runs decode.
    Worker,
    /// Single owner of the display sink.
    Presentation,
}

impl fmt::Display for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecContext::Worker => write!(f, "worker"),
            ExecContext::Presentation => write!(f, "presentation"),
        }
    }
}

tokio::task_local! {
    static EXEC_CONTEXT: ExecContext;
}

/// Context of the calling code, `None` outside any declared context (e.g. an
/// ingress callback thread).
pub fn current() -> Option<ExecContext> {
    EXEC_CONTEXT.try_with(|ctx| *ctx).ok()
}

pub fn is_current(ctx: ExecContext) -> bool {
    current() == Some(ctx)
}

/// Runs `f` on the blocking worker pool tagged as [`ExecContext::Worker`].
pub async fn run_on_worker<F, R>(f: F) -> FrameResult<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || EXEC_CONTEXT.sync_scope(ExecContext::Worker, f))
        .await
        .map_err(|e| FrameError::Worker(e.to_string()))
}

/// Tags `fut` as running on [`ExecContext::Presentation`].
pub fn presentation<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    EXEC_CONTEXT.scope(ExecContext::Presentation, fut)
}

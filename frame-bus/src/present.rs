use std::sync::Arc;

use crate::{
    context::{self, ExecContext},
    error::FrameResult,
    frame::DecodedFrame,
    sink::DisplaySink,
    stats::PipelineCounters,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentOutcome {
    pub seq: u64,
    /// The sink's resource was recreated for new dimensions.
    pub recreated: bool,
}

/// Applies decoded frames to a [`DisplaySink`] and flips them visible on the
/// next [`PresentStage::tick`].
pub struct PresentStage<S> {
    sink: S,
    needs_swap: bool,
    counters: Arc<PipelineCounters>,
}

impl<S: DisplaySink> PresentStage<S> {
    pub fn new(sink: S, counters: Arc<PipelineCounters>) -> Self {
        Self {
            sink,
            needs_swap: false,
            counters,
        }
    }

    pub fn present(&mut self, frame: &DecodedFrame) -> FrameResult<PresentOutcome> {
        debug_assert!(
            !context::is_current(ExecContext::Worker),
            "present must run on the presentation context"
        );
        let layout = frame.layout();
        let recreated = self.sink.dimensions() != Some((layout.width, layout.height));
        if recreated {
            self.sink.ensure_resource(layout.width, layout.height)?;
            log::info!(
                "display resource recreated for frame {}: {}x{}",
                frame.seq(),
                layout.width,
                layout.height
            );
        }
        self.sink.upload(frame)?;
        self.needs_swap = true;
        self.counters.on_presented(frame.seq(), recreated);

        Ok(PresentOutcome {
            seq: frame.seq(),
            recreated,
        })
    }

    /// Observation tick. Returns whether a new image became visible.
    pub fn tick(&mut self) -> bool {
        if !self.needs_swap {
            return false;
        }
        self.sink.swap_visible();
        self.needs_swap = false;
        self.counters.on_swap();
        true
    }

    pub fn needs_swap(&self) -> bool {
        self.needs_swap
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
#[path = "present_test.rs"]
mod present_test;

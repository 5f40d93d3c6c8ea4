use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    codec::FrameCodec,
    context,
    decode::DecodeStage,
    error::FrameError,
    frame::DecodedFrame,
    pool::{BoundedPool, BufferPool, DEFAULT_POOL_MAX_SIZE},
    present::PresentStage,
    sink::DisplaySink,
    slot::{FrameSlotReceiver, FrameSlotSender, frame_slot},
    stats::{PipelineCounters, PipelineStats},
};

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Idle buffers kept by each of the two pools.
    pub pool_max_size: usize,
    /// Period of the presentation observation tick.
    pub tick_interval: Duration,
    /// Decoded frames that may wait for the presentation context.
    pub present_queue: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            tick_interval: Duration::from_micros(16_667),
            present_queue: 2,
        }
    }
}

impl PipelineConfig {
    pub fn with_pool_max_size(mut self, pool_max_size: usize) -> Self {
        self.pool_max_size = pool_max_size;
        self
    }

    pub fn with_tick_hz(mut self, hz: u32) -> Self {
        self.tick_interval = Duration::from_secs_f64(1.0 / hz.max(1) as f64);
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_present_queue(mut self, present_queue: usize) -> Self {
        self.present_queue = present_queue.max(1);
        self
    }
}

/// Entry point for the upstream delivery callback. Cheap to clone and safe
/// to call from any thread.
#[derive(Clone)]
pub struct FrameIngress {
    slot: FrameSlotSender,
    counters: Arc<PipelineCounters>,
}

impl FrameIngress {
    /// Stages `payload` for decoding. Never waits for decode; a payload still
    /// pending from an earlier call is replaced.
    pub fn on_frame_received(&self, payload: &[u8]) {
        match self.slot.send(payload) {
            Ok(write) => {
                self.counters.on_received(write.replaced);
                if write.replaced {
                    log::trace!("frame {} replaced a pending frame", write.seq);
                }
            }
            Err(FrameError::EmptyFrame) => {
                self.counters.on_ignored();
                log::debug!("ignoring empty frame");
            }
            Err(FrameError::Closed) => {
                self.counters.on_ignored();
                log::debug!("ignoring frame: pipeline closed");
            }
            Err(e) => {
                self.counters.on_ignored();
                log::warn!("dropping received frame: {}", e);
            }
        }
    }
}

/// Receive, decode and present loop for one stream of encoded frames.
pub struct FramePipeline {
    id: String,
    config: PipelineConfig,
    cancel: CancellationToken,
    started: AtomicBool,
    ingress: FrameIngress,
    receiver: Mutex<Option<FrameSlotReceiver>>,
    counters: Arc<PipelineCounters>,
    encoded_pool: Arc<BoundedPool>,
    pixel_pool: Arc<BoundedPool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl FramePipeline {
    pub fn new(id: &str, config: PipelineConfig) -> Self {
        let (sender, receiver) = frame_slot();
        let counters = Arc::new(PipelineCounters::default());
        Self {
            id: id.to_string(),
            encoded_pool: Arc::new(BoundedPool::new("encoded", config.pool_max_size)),
            pixel_pool: Arc::new(BoundedPool::new("pixels", config.pool_max_size)),
            config,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            ingress: FrameIngress {
                slot: sender,
                counters: Arc::clone(&counters),
            },
            receiver: Mutex::new(Some(receiver)),
            counters,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn ingress(&self) -> FrameIngress {
        self.ingress.clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters
            .snapshot(self.encoded_pool.stats(), self.pixel_pool.stats())
    }

    /// Spawns the decode loop (worker context) and the presentation loop
    /// owning `sink`. Must be called inside a tokio runtime.
    pub fn start<S>(&self, codec: Arc<dyn FrameCodec>, sink: S)
    where
        S: DisplaySink + 'static,
    {
        if self.started.swap(true, Ordering::Relaxed) {
            log::warn!("pipeline {} already started", self.id);
            return;
        }
        let Some(receiver) = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            log::warn!("pipeline {} cannot be restarted", self.id);
            return;
        };

        let stage = Arc::new(DecodeStage::new(
            codec,
            self.encoded_pool.clone() as Arc<dyn BufferPool>,
            self.pixel_pool.clone() as Arc<dyn BufferPool>,
        ));
        log::info!(
            "pipeline {}: starting ({} codec, pool size {}, tick {:?})",
            self.id,
            stage.codec_name(),
            self.config.pool_max_size,
            self.config.tick_interval
        );

        let (frame_tx, frame_rx) = mpsc::channel(self.config.present_queue.max(1));

        let decode = tokio::spawn(Self::decode_loop(
            self.id.clone(),
            self.cancel.clone(),
            receiver,
            stage,
            frame_tx,
            Arc::clone(&self.counters),
        ));
        let present = tokio::spawn(context::presentation(Self::present_loop(
            self.id.clone(),
            self.cancel.clone(),
            frame_rx,
            PresentStage::new(sink, Arc::clone(&self.counters)),
            self.config.tick_interval,
            Arc::clone(&self.counters),
        )));

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.push(decode);
        handles.push(present);
    }

    pub fn stop(&self) {
        self.cancel.cancel();
        self.ingress.slot.close();
    }

    /// Waits for the loops spawned by [`FramePipeline::start`] to exit.
    pub async fn join(&self) {
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                log::error!("pipeline {} task error: {}", self.id, e);
            }
        }
    }

    async fn decode_loop(
        id: String,
        cancel: CancellationToken,
        receiver: FrameSlotReceiver,
        stage: Arc<DecodeStage>,
        frame_tx: mpsc::Sender<DecodedFrame>,
        counters: Arc<PipelineCounters>,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = receiver.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            let staged = match receiver.take_with(|seq, payload| stage.stage(seq, payload)) {
                Some(Ok(staged)) => staged,
                Some(Err(e)) => {
                    counters.on_decode_failure();
                    log::warn!("pipeline {}: cannot stage frame: {}", id, e);
                    continue;
                }
                None => continue,
            };

            let seq = staged.seq();
            let worker_stage = Arc::clone(&stage);
            match context::run_on_worker(move || worker_stage.decode_frame(&staged)).await {
                Ok(Ok(frame)) => {
                    counters.on_decoded();
                    if frame_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    counters.on_decode_failure();
                    if e.is_recoverable() {
                        log::warn!("pipeline {}: dropping frame {}: {}", id, seq, e);
                    } else {
                        log::error!("pipeline {}: frame {} failed: {}", id, seq, e);
                    }
                }
                Err(e) => {
                    counters.on_decode_failure();
                    log::error!("pipeline {}: decode worker failed: {}", id, e);
                }
            }
        }
        receiver.close();
        log::debug!("pipeline {}: decode loop finished", id);
    }

    async fn present_loop<S: DisplaySink>(
        id: String,
        cancel: CancellationToken,
        mut frame_rx: mpsc::Receiver<DecodedFrame>,
        mut present: PresentStage<S>,
        tick_interval: Duration,
        counters: Arc<PipelineCounters>,
    ) {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                frame = frame_rx.recv() => {
                    let Some(frame) = frame else {
                        break;
                    };
                    if let Err(e) = present.present(&frame) {
                        counters.on_present_failure();
                        log::error!("pipeline {}: present frame {} failed: {}", id, frame.seq(), e);
                    }
                }
                _ = ticker.tick() => {
                    present.tick();
                }
            }
        }
        present.tick();
        log::debug!("pipeline {}: presentation loop finished", id);
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

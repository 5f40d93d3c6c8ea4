use std::sync::Arc;

use frame_bus::{
    pipeline::{FrameIngress, FramePipeline},
    sink::{MemorySink, VisibleFrames},
    stats::PipelineStats,
};

use crate::config::RelayConfig;

/// Shared application state: the pipeline fed by the configured topic and the
/// images it has made visible.
pub(crate) struct Relay {
    config: RelayConfig,
    pipeline: FramePipeline,
    visible: VisibleFrames,
}

impl Relay {
    pub(crate) fn start(config: RelayConfig) -> Arc<Self> {
        let pipeline = FramePipeline::new(&config.key_expr, config.pipeline_config());
        let mut sink = MemorySink::new();
        if let Some(max_pixels) = config.max_texture_pixels {
            sink = sink.with_max_pixels(max_pixels);
        }
        let visible = sink.visible();
        pipeline.start(Arc::new(config.codec()), sink);
        log::info!("relay subscribed to {}", config.key_expr);

        Arc::new(Self {
            config,
            pipeline,
            visible,
        })
    }

    pub(crate) fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub(crate) fn key_expr(&self) -> &str {
        &self.config.key_expr
    }

    /// Exact match against the configured key expression.
    pub(crate) fn accepts(&self, key: &str) -> bool {
        key.trim_matches('/') == self.config.key_expr.trim_matches('/')
    }

    pub(crate) fn ingress(&self) -> FrameIngress {
        self.pipeline.ingress()
    }

    pub(crate) fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    pub(crate) fn visible(&self) -> VisibleFrames {
        self.visible.clone()
    }

    pub(crate) async fn shutdown(&self) {
        self.pipeline.stop();
        self.pipeline.join().await;
        log::info!("relay for {} stopped", self.config.key_expr);
    }
}

use std::time::Duration;

use frame_bus::{pipeline::FrameIngress, testsrc::TestPattern};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::SyntheticConfig;

/// Publishes a moving test pattern into `ingress` until `cancel` fires.
pub(crate) fn start_synthetic_source(
    config: SyntheticConfig,
    ingress: FrameIngress,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let pattern = TestPattern::new(config.width, config.height).with_quality(config.quality);
        log::info!(
            "synthetic source: {}x{} at {} fps",
            pattern.width(),
            pattern.height(),
            config.fps
        );
        run(pattern, config.frame_interval(), ingress, cancel).await;
        log::info!("synthetic source stopped");
    });
}

async fn run(
    pattern: TestPattern,
    interval: Duration,
    ingress: FrameIngress,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut index = 0u64;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let encoded = tokio::task::spawn_blocking(move || pattern.frame(index)).await;
        match encoded {
            Ok(Ok(frame)) => ingress.on_frame_received(&frame),
            Ok(Err(e)) => {
                log::error!("synthetic source: encode failed: {:#}", e);
                break;
            }
            Err(e) => {
                log::error!("synthetic source: encode task failed: {}", e);
                break;
            }
        }
        index += 1;
    }
}

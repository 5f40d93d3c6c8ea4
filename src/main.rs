use tokio_util::sync::CancellationToken;

mod api;
mod config;
mod handler;
mod relay;
mod source;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .filter_module("frame_bus", log::LevelFilter::Debug)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = config::RelayConfig::from_env()?;

    let relay = relay::Relay::start(config.clone());
    let listener = api::bind(&config.listen_addr).await?;

    let cancel = CancellationToken::new();

    let server = api::start_api_server(listener, relay.clone(), cancel.clone());

    if let Some(synthetic) = config.synthetic.clone() {
        source::start_synthetic_source(synthetic, relay.ingress(), cancel.clone());
    }

    tokio::select! {
        _ = cancel.cancelled() => {},
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
        },
    }

    if let Err(e) = server.await {
        log::error!("API server task failed: {}", e);
    }
    relay.shutdown().await;
    Ok(())
}

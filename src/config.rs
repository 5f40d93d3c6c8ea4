use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use frame_bus::{
    codec::{DEFAULT_MAX_DIMENSION, JpegCodec},
    pipeline::PipelineConfig,
    pool::DEFAULT_POOL_MAX_SIZE,
};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "FRAME_RELAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "frame-relay.json";
pub const DEFAULT_KEY_EXPR: &str = "rpi/camera/image_jpeg";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub listen_addr: String,
    /// Topic whose payloads are fed to the pipeline.
    pub key_expr: String,
    pub pool_max_size: usize,
    pub tick_hz: u32,
    pub row_alignment: usize,
    pub present_queue: usize,
    pub max_payload_bytes: usize,
    /// Frames wider or taller than this are dropped before decoding.
    pub max_frame_width: u32,
    pub max_frame_height: u32,
    pub max_texture_pixels: Option<u64>,
    pub snapshot_quality: u8,
    pub synthetic: Option<SyntheticConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            key_expr: DEFAULT_KEY_EXPR.to_string(),
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            tick_hz: 60,
            row_alignment: 4,
            present_queue: 2,
            max_payload_bytes: 16 * 1024 * 1024,
            max_frame_width: DEFAULT_MAX_DIMENSION,
            max_frame_height: DEFAULT_MAX_DIMENSION,
            max_texture_pixels: None,
            snapshot_quality: 85,
            synthetic: None,
        }
    }
}

/// Built-in test pattern publisher.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub fps: u32,
    pub width: u16,
    pub height: u16,
    pub quality: u8,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 640,
            height: 480,
            quality: 85,
        }
    }
}

impl SyntheticConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

impl RelayConfig {
    /// Loads the file named by `FRAME_RELAY_CONFIG`, or `frame-relay.json`.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load(&path)
    }

    /// Missing files yield the defaults; unreadable or invalid ones are errors.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::info!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("config loaded from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        if config.key_expr.is_empty() {
            anyhow::bail!("key_expr must not be empty");
        }
        Ok(config)
    }

    pub fn codec(&self) -> JpegCodec {
        JpegCodec::with_row_alignment(self.row_alignment)
            .with_max_dimensions(self.max_frame_width, self.max_frame_height)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_pool_max_size(self.pool_max_size)
            .with_tick_hz(self.tick_hz)
            .with_present_queue(self.present_queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() -> anyhow::Result<()> {
        let config = RelayConfig::parse(r#"{ "key_expr": "lab/cam0/jpeg", "tick_hz": 30 }"#)?;
        assert_eq!(config.key_expr, "lab/cam0/jpeg");
        assert_eq!(config.tick_hz, 30);
        assert_eq!(config.pool_max_size, DEFAULT_POOL_MAX_SIZE);
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.synthetic.is_none());
        assert_eq!(config.codec().max_dimensions(), (8192, 8192));
        Ok(())
    }

    #[test]
    fn test_synthetic_section() -> anyhow::Result<()> {
        let config = RelayConfig::parse(r#"{ "synthetic": { "fps": 10, "width": 64 } }"#)?;
        let synthetic = config.synthetic.expect("synthetic section");
        assert_eq!(synthetic.fps, 10);
        assert_eq!(synthetic.width, 64);
        assert_eq!(synthetic.height, 480);
        assert_eq!(synthetic.frame_interval(), Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn test_empty_key_expr_rejected() {
        assert!(RelayConfig::parse(r#"{ "key_expr": "" }"#).is_err());
        assert!(RelayConfig::parse("not json").is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() -> anyhow::Result<()> {
        let config = RelayConfig::load(Path::new("/nonexistent/frame-relay.json"))?;
        assert_eq!(config.key_expr, DEFAULT_KEY_EXPR);
        Ok(())
    }

    #[test]
    fn test_frame_limits_reach_codec() -> anyhow::Result<()> {
        let config = RelayConfig::parse(
            r#"{ "max_frame_width": 1920, "max_frame_height": 1080, "row_alignment": 16 }"#,
        )?;
        let codec = config.codec();
        assert_eq!(codec.max_dimensions(), (1920, 1080));
        assert_eq!(codec.row_alignment(), 16);
        Ok(())
    }

    #[test]
    fn test_pipeline_config_mapping() {
        let config = RelayConfig {
            pool_max_size: 3,
            tick_hz: 100,
            present_queue: 0,
            ..Default::default()
        };
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.pool_max_size, 3);
        assert_eq!(pipeline.tick_interval, Duration::from_millis(10));
        assert_eq!(pipeline.present_queue, 1);
    }
}

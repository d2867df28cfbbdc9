use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::{
    DEFAULT_MAX_COMETS, DEFAULT_MAX_TX_PER_BLOCK, DEFAULT_PIXEL_RATIO_SCALE, EngineConfig,
};
use crate::feed::DEFAULT_API_BASE_URL;
use crate::universe::ColorMode;

/// Process settings, read from the environment (and `.env`) at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_base_url: String,
    pub realtime_poll_ms: u64,
    pub mempool_poll_ms: u64,
    pub frame_ms: u64,
    pub max_tx_per_block: usize,
    pub max_comets: usize,
    pub pixel_ratio_scale: f64,
    pub color_mode: ColorMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            realtime_poll_ms: 30_000,
            mempool_poll_ms: 5_000,
            frame_ms: 16,
            max_tx_per_block: DEFAULT_MAX_TX_PER_BLOCK,
            max_comets: DEFAULT_MAX_COMETS,
            pixel_ratio_scale: DEFAULT_PIXEL_RATIO_SCALE,
            color_mode: ColorMode::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset keys take their default; unparsable or out-of-range values
    /// are logged and also take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let non_empty = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Self {
            host: non_empty("HOST", d.host),
            port: parse_or(&lookup, "PORT", d.port, |_| true),
            api_base_url: non_empty("API_BASE_URL", d.api_base_url),
            realtime_poll_ms: parse_or(&lookup, "REALTIME_POLL_MS", d.realtime_poll_ms, |v| *v > 0),
            mempool_poll_ms: parse_or(&lookup, "MEMPOOL_POLL_MS", d.mempool_poll_ms, |v| *v > 0),
            frame_ms: parse_or(&lookup, "FRAME_MS", d.frame_ms, |v| *v > 0),
            max_tx_per_block: parse_or(&lookup, "MAX_TX_PER_BLOCK", d.max_tx_per_block, |_| true),
            max_comets: parse_or(&lookup, "MAX_COMETS", d.max_comets, |_| true),
            pixel_ratio_scale: parse_or(&lookup, "PIXEL_RATIO_SCALE", d.pixel_ratio_scale, |v| {
                v.is_finite() && *v > 0.0
            }),
            color_mode: parse_or(&lookup, "COLOR_MODE", d.color_mode, |_| true),
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            max_tx_per_block: self.max_tx_per_block,
            max_comets: self.max_comets,
            pixel_ratio_scale: self.pixel_ratio_scale,
            color_mode: self.color_mode,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }

    pub fn realtime_interval(&self) -> Duration {
        Duration::from_millis(self.realtime_poll_ms)
    }

    pub fn mempool_interval(&self) -> Duration {
        Duration::from_millis(self.mempool_poll_ms)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!("CONFIG - ignoring invalid {key}={raw:?}, using default");
            default
        }
    }
}

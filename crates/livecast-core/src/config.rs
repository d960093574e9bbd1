//! Player configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Back-buffer kept by VOD sessions (seconds). Live sessions keep none.
    pub vod_back_buffer_secs: u64,
    /// Idle time before controls hide while playing (milliseconds)
    pub auto_hide_delay_ms: u64,
    /// Request timeout for playlists and fragments (milliseconds)
    pub request_timeout_ms: u64,
    /// Retries inside the transport before a fetch failure is reported as fatal
    pub fragment_retry_attempts: u32,
    /// Delay between those retries (milliseconds)
    pub retry_delay_ms: u64,
    /// Live playback starts this many segments behind the live edge
    pub live_sync_segments: u64,
    /// Forward buffer the loader fills ahead of the playhead (seconds)
    pub max_buffer_secs: f64,
    /// Starting sink volume (0.0 - 1.0)
    pub initial_volume: f64,
    /// Try native playback before the software client
    pub prefer_native: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            vod_back_buffer_secs: 90,
            auto_hide_delay_ms: 3000,
            request_timeout_ms: 10000,
            fragment_retry_attempts: 3,
            retry_delay_ms: 1000,
            live_sync_segments: 3,
            max_buffer_secs: 30.0,
            initial_volume: 1.0,
            prefer_native: false,
        }
    }
}

impl PlayerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auto_hide_delay_ms == 0 {
            return Err(Error::InvalidConfig(
                "auto_hide_delay_ms must be greater than zero".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::InvalidConfig(format!(
                "initial_volume {} outside 0.0-1.0",
                self.initial_volume
            )));
        }
        if !self.max_buffer_secs.is_finite() || self.max_buffer_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "max_buffer_secs must be a positive number, got {}",
                self.max_buffer_secs
            )));
        }
        Ok(())
    }

    pub fn auto_hide_delay(&self) -> Duration {
        Duration::from_millis(self.auto_hide_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Transport configuration for a session
    pub fn transport_config(&self, is_live: bool) -> TransportConfig {
        TransportConfig {
            low_latency_mode: is_live,
            back_buffer_length: if is_live {
                Duration::ZERO
            } else {
                Duration::from_secs(self.vod_back_buffer_secs)
            },
        }
    }
}

/// Configuration handed to the transport constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub low_latency_mode: bool,
    /// Played media retained for scrub-back
    pub back_buffer_length: Duration,
}

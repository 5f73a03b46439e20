//! # Playback Configuration
//!
//! Tunables for the playback session and the video overlay.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// Playback session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Volume applied before any preference is restored, in `0.0..=1.0`.
    ///
    /// Default: 1.0.
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    /// Maximum audio/video divergence tolerated before the video is
    /// re-aligned to the audio.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_drift_tolerance")]
    pub drift_tolerance: Duration,

    /// How often the overlay compares audio and video positions. Must be
    /// shorter than `drift_tolerance`.
    ///
    /// Default: 250 ms.
    #[serde(default = "default_overlay_sync_interval")]
    pub overlay_sync_interval: Duration,

    /// Sampling period for elements that emit no progress signals.
    ///
    /// Default: 1 second.
    #[serde(default = "default_fallback_poll_interval")]
    pub fallback_poll_interval: Duration,

    /// Maximum number of entries kept in the play history.
    ///
    /// Default: 20.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            drift_tolerance: default_drift_tolerance(),
            overlay_sync_interval: default_overlay_sync_interval(),
            fallback_poll_interval: default_fallback_poll_interval(),
            history_limit: default_history_limit(),
        }
    }
}

impl PlaybackConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(PlaybackError::InvalidConfig(
                "default_volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.drift_tolerance.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "drift_tolerance must be > 0".to_string(),
            ));
        }

        if self.overlay_sync_interval.is_zero()
            || self.overlay_sync_interval >= self.drift_tolerance
        {
            return Err(PlaybackError::InvalidConfig(
                "overlay_sync_interval must be > 0 and shorter than drift_tolerance".to_string(),
            ));
        }

        if self.fallback_poll_interval.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "fallback_poll_interval must be > 0".to_string(),
            ));
        }

        if self.history_limit == 0 {
            return Err(PlaybackError::InvalidConfig(
                "history_limit must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_volume() -> f32 {
    1.0
}

fn default_drift_tolerance() -> Duration {
    Duration::from_millis(500)
}

fn default_overlay_sync_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_fallback_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_history_limit() -> usize {
    20
}

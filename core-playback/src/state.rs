//! Observable playback state.

use serde::{Deserialize, Serialize};

use crate::track::Track;

/// Lifecycle of the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    /// Entitlement passed; media is being acquired.
    Loading,
    Playing,
    Paused,
    /// Reached the end with looping off. Transient, settles to `Idle`.
    Ended,
    /// Acquisition or playback failed. Transient, settles to `Idle`.
    Failed,
}

impl PlaybackStatus {
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }
}

/// Point-in-time view of the session, published on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub current_track: Option<Track>,
    pub status: PlaybackStatus,
    pub position_secs: f64,
    /// Known once the catalog or the media reports it.
    pub duration_secs: Option<f64>,
    pub volume: f32,
    pub loop_enabled: bool,
    pub video_overlay_visible: bool,
}

impl PlaybackSnapshot {
    pub(crate) fn new(volume: f32) -> Self {
        Self {
            current_track: None,
            status: PlaybackStatus::Idle,
            position_secs: 0.0,
            duration_secs: None,
            volume,
            loop_enabled: false,
            video_overlay_visible: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }

    /// Playback progress in `0.0..=1.0`, when the duration is known.
    pub fn progress(&self) -> Option<f64> {
        self.duration_secs
            .filter(|d| *d > 0.0)
            .map(|d| (self.position_secs / d).clamp(0.0, 1.0))
    }

    /// Clear the track and settle into `Idle` at position zero.
    pub(crate) fn reset(&mut self) {
        self.current_track = None;
        self.status = PlaybackStatus::Idle;
        self.position_secs = 0.0;
        self.duration_secs = None;
    }

    /// Clamp a requested position into `[0, duration]`.
    pub(crate) fn clamp_position(&self, secs: f64) -> f64 {
        let lower = secs.max(0.0);
        match self.duration_secs {
            Some(duration) => lower.min(duration),
            None => lower,
        }
    }
}

/// Result of a [`play`](crate::PlaybackSession::play) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayOutcome {
    /// The platform confirmed playback.
    Started,
    /// Refused by the entitlement gate; state unchanged.
    NotEntitled,
    /// Acquisition or platform play failed; session is back to `Idle`.
    Failed,
    /// A newer request replaced this one before it completed.
    Superseded,
}

/// Clamp a volume into `[0, 1]`; `None` for NaN.
pub(crate) fn clamp_volume(volume: f32) -> Option<f32> {
    if volume.is_nan() {
        None
    } else {
        Some(volume.clamp(0.0, 1.0))
    }
}

pub(crate) fn secs_to_millis(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_position_with_known_duration() {
        let mut snapshot = PlaybackSnapshot::new(1.0);
        snapshot.duration_secs = Some(180.0);
        assert_eq!(snapshot.clamp_position(-5.0), 0.0);
        assert_eq!(snapshot.clamp_position(500.0), 180.0);
        assert_eq!(snapshot.clamp_position(42.5), 42.5);
    }

    #[test]
    fn clamp_position_with_unknown_duration() {
        let snapshot = PlaybackSnapshot::new(1.0);
        assert_eq!(snapshot.clamp_position(-1.0), 0.0);
        assert_eq!(snapshot.clamp_position(9_999.0), 9_999.0);
    }

    #[test]
    fn volume_clamping() {
        assert_eq!(clamp_volume(1.5), Some(1.0));
        assert_eq!(clamp_volume(-0.2), Some(0.0));
        assert_eq!(clamp_volume(0.3), Some(0.3));
        assert_eq!(clamp_volume(f32::NAN), None);
    }

    #[test]
    fn progress_requires_duration() {
        let mut snapshot = PlaybackSnapshot::new(1.0);
        snapshot.position_secs = 30.0;
        assert_eq!(snapshot.progress(), None);

        snapshot.duration_secs = Some(120.0);
        assert_eq!(snapshot.progress(), Some(0.25));
    }

    #[test]
    fn millis_conversion() {
        assert_eq!(secs_to_millis(1.2345), 1235);
        assert_eq!(secs_to_millis(-3.0), 0);
        assert_eq!(secs_to_millis(f64::INFINITY), 0);
    }
}

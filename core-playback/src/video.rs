//! Full-screen video overlay kept in step with the audio session.
//!
//! While the overlay is open the audio element is paused and the video plays
//! instead; the session position stays the ground truth. Each tick compares
//! the two:
//!
//! - drift above `drift_tolerance`: the video is moved to the audio position
//! - otherwise: the video's progress is copied into the session position
//!
//! Closing the overlay resumes audio from the last synchronized position if
//! it was playing when the overlay opened. The overlay is registered on the
//! session, which pauses the video and cancels the sync loop itself when the
//! track changes, playback stops or the audio element fails.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::VideoSurface;
use core_runtime::events::{CoreEvent, VideoEvent};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::session::PlaybackSession;
use crate::state::{secs_to_millis, PlaybackStatus};

/// Result of one synchronization tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// Within tolerance; the video position was mirrored into the session.
    InSync,
    /// The video was moved back to the audio position.
    Corrected { drift_secs: f64 },
    /// The session moved on from the overlay's track; the video is paused
    /// and the overlay closed.
    Detached,
    /// The overlay is not open.
    Inactive,
}

struct OverlayState {
    open: bool,
    track_id: String,
    was_playing: bool,
}

struct OverlayShared {
    session: PlaybackSession,
    link_id: u64,
    surface: Arc<dyn VideoSurface>,
    state: Mutex<OverlayState>,
    cancel: CancellationToken,
}

/// Handle to an open video overlay.
#[derive(Clone)]
pub struct VideoOverlay {
    shared: Arc<OverlayShared>,
}

impl VideoOverlay {
    /// Pause audio and start the video at the current audio position.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidConfig`] if the overlay feature is disabled
    /// - [`PlaybackError::NoTrackLoaded`] without a current track
    /// - [`PlaybackError::PlaybackRejected`] while the track is still loading
    ///   or when the video refuses to play; audio is restored in that case
    #[instrument(skip(session, surface))]
    pub async fn open(session: &PlaybackSession, surface: Arc<dyn VideoSurface>) -> Result<Self> {
        if !session.video_overlay_enabled() {
            return Err(PlaybackError::InvalidConfig(
                "video overlay is disabled".to_string(),
            ));
        }

        let before = session.snapshot();
        let track_id = before
            .current_track_id()
            .ok_or(PlaybackError::NoTrackLoaded)?
            .to_string();
        if before.status == PlaybackStatus::Loading {
            return Err(PlaybackError::PlaybackRejected(
                "track is still loading".to_string(),
            ));
        }
        if before.video_overlay_visible {
            return Err(PlaybackError::PlaybackRejected(
                "video overlay is already open".to_string(),
            ));
        }

        let was_playing = before.is_playing();
        session.pause().await;

        let cancel = CancellationToken::new();
        let attached = session.attach_overlay(&track_id, Arc::clone(&surface), cancel.clone());
        let Some(link_id) = attached else {
            if was_playing {
                session.resume().await;
            }
            return Err(PlaybackError::PlaybackRejected(
                "playback changed while opening the video overlay".to_string(),
            ));
        };

        let position = session.snapshot().position_secs;
        surface.seek(Duration::from_secs_f64(position.max(0.0)));
        if let Err(err) = surface.play().await {
            warn!(error = %err, "Video refused to play");
            session.release_overlay(link_id);
            if was_playing {
                session.resume().await;
            }
            return Err(PlaybackError::PlaybackRejected(err.to_string()));
        }
        if cancel.is_cancelled() {
            surface.pause();
            return Err(PlaybackError::PlaybackRejected(
                "track changed while the video was starting".to_string(),
            ));
        }

        debug!(track_id = %track_id, position, was_playing, "Video overlay opened");
        let _ = session
            .events()
            .emit(CoreEvent::Video(VideoEvent::OverlayOpened {
                track_id: track_id.clone(),
                position_ms: secs_to_millis(position),
            }));

        Ok(Self {
            shared: Arc::new(OverlayShared {
                session: session.clone(),
                link_id,
                surface,
                state: Mutex::new(OverlayState {
                    open: true,
                    track_id,
                    was_playing,
                }),
                cancel,
            }),
        })
    }

    /// `false` once closed, or once the session has detached the overlay.
    pub fn is_open(&self) -> bool {
        self.shared.state.lock().open && !self.shared.cancel.is_cancelled()
    }

    /// Whether audio was playing when the overlay opened.
    pub fn was_playing(&self) -> bool {
        self.shared.state.lock().was_playing
    }

    /// Apply a user seek on the video to both video and audio.
    /// Returns the applied position.
    pub async fn seek_video(&self, secs: f64) -> Option<f64> {
        if !self.is_open() {
            return None;
        }
        let applied = self.shared.session.seek(secs).await?;
        self.shared
            .surface
            .seek(Duration::from_secs_f64(applied));
        Some(applied)
    }

    /// Compare audio and video once and reconcile them.
    pub async fn sync_tick(&self) -> SyncOutcome {
        let track_id = {
            let state = self.shared.state.lock();
            if !state.open {
                return SyncOutcome::Inactive;
            }
            state.track_id.clone()
        };

        let snapshot = self.shared.session.snapshot();
        if self.shared.cancel.is_cancelled()
            || snapshot.current_track_id() != Some(track_id.as_str())
        {
            debug!(track_id = %track_id, "Track changed under the overlay, detaching");
            self.shutdown_overlay();
            self.shared.surface.pause();
            return SyncOutcome::Detached;
        }

        let audio = snapshot.position_secs;
        let video = self.shared.surface.position().as_secs_f64();
        let drift = (video - audio).abs();
        let tolerance = self.shared.session.config().drift_tolerance.as_secs_f64();

        if drift > tolerance {
            self.shared
                .surface
                .seek(Duration::from_secs_f64(audio.max(0.0)));
            debug!(audio, video, drift, "Corrected video drift");
            let _ = self
                .shared
                .session
                .events()
                .emit(CoreEvent::Video(VideoEvent::DriftCorrected {
                    track_id,
                    drift_ms: secs_to_millis(drift),
                }));
            return SyncOutcome::Corrected { drift_secs: drift };
        }

        if drift > 0.0 {
            self.shared.session.seek(video).await;
        }
        SyncOutcome::InSync
    }

    /// Tick every `overlay_sync_interval` until closed or detached.
    pub async fn run_sync_loop(&self) {
        let period = self.shared.session.config().overlay_sync_interval;
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shared.cancel.cancelled() => break,
                _ = interval.tick() => {
                    match self.sync_tick().await {
                        SyncOutcome::Detached | SyncOutcome::Inactive => break,
                        SyncOutcome::InSync | SyncOutcome::Corrected { .. } => {}
                    }
                }
            }
        }
        debug!("Video sync loop stopped");
    }

    /// Run [`run_sync_loop`](Self::run_sync_loop) on a background task.
    pub fn spawn_sync_loop(&self) -> JoinHandle<()> {
        let overlay = self.clone();
        tokio::spawn(async move { overlay.run_sync_loop().await })
    }

    /// Pause the video and hand playback back to audio.
    /// Returns `false` if the overlay was already closed or detached.
    #[instrument(skip(self))]
    pub async fn close(&self) -> bool {
        let Some((track_id, was_playing)) = self.shutdown_overlay() else {
            return false;
        };

        self.shared.surface.pause();

        let session = &self.shared.session;
        let same_track = session.snapshot().current_track_id() == Some(track_id.as_str());
        let mut resumed_audio = false;
        if same_track {
            let video = self.shared.surface.position().as_secs_f64();
            session.seek(video).await;
            if was_playing {
                resumed_audio = session.resume().await;
            }
        }

        debug!(track_id = %track_id, resumed_audio, "Video overlay closed");
        let _ = session
            .events()
            .emit(CoreEvent::Video(VideoEvent::OverlayClosed {
                track_id: Some(track_id),
                resumed_audio,
            }));
        true
    }

    /// Keyboard shortcut handling. `Escape` closes the overlay.
    pub async fn handle_key(&self, key: &str) -> bool {
        match key {
            "Escape" => self.close().await,
            _ => false,
        }
    }

    /// Mark closed, stop the loop and drop the session registration.
    /// `None` if already closed or if the session detached the overlay first.
    fn shutdown_overlay(&self) -> Option<(String, bool)> {
        let closed = {
            let mut state = self.shared.state.lock();
            if !state.open {
                return None;
            }
            state.open = false;
            (state.track_id.clone(), state.was_playing)
        };
        let detached = self.shared.cancel.is_cancelled();
        self.shared.cancel.cancel();
        self.shared.session.release_overlay(self.shared.link_id);
        (!detached).then_some(closed)
    }
}

impl std::fmt::Debug for VideoOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("VideoOverlay")
            .field("open", &state.open)
            .field("track_id", &state.track_id)
            .field("was_playing", &state.was_playing)
            .finish()
    }
}

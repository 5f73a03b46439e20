//! # Playback Session
//!
//! The single authority over what is playing. A [`PlaybackSession`] owns at
//! most one [`OutputResource`], gates priced tracks behind the entitlement
//! check and publishes a [`PlaybackSnapshot`] on every change.
//!
//! ## Request tokens
//!
//! Every `play` and `stop` claims a new token. After each suspension point a
//! `play` request re-checks that its token is still the latest and bails out
//! with [`PlaybackError::StaleCompletion`] otherwise, releasing anything it
//! acquired. Only the newest request can ever reach `Playing`.
//!
//! ## Locking
//!
//! Synchronous state sits behind a `parking_lot::Mutex` that is never held
//! across an `.await`. Opening and installing an element additionally holds
//! an async gate so two elements are never live at the same time.
//!
//! ## Usage
//!
//! ```ignore
//! let session = PlaybackSession::new(&core_config, PlaybackConfig::default(), EventBus::default())?;
//! session.restore_preferences().await;
//!
//! match session.play(track).await {
//!     PlayOutcome::Started => {}
//!     PlayOutcome::NotEntitled => show_purchase_dialog(),
//!     PlayOutcome::Failed | PlayOutcome::Superseded => {}
//! }
//!
//! let mut state = session.subscribe();
//! while state.changed().await.is_ok() {
//!     render(&state.borrow());
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{
    AudioOutput, Clock, EntitlementChecker, MediaElement, MediaSignal, MediaSignalStream,
    MediaSource, NoticeKind, Notifier, VideoSurface,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, VideoEvent};
use core_runtime::logging::strip_query;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::history::{HistoryEntry, PlayHistory};
use crate::output::{self, OutputId, OutputResource};
use crate::persistence::{LastSession, SessionStore};
use crate::state::{clamp_volume, secs_to_millis, PlayOutcome, PlaybackSnapshot, PlaybackStatus};
use crate::track::Track;

/// Video overlay currently standing in for the audio element.
struct OverlayLink {
    id: u64,
    track_id: String,
    surface: Arc<dyn VideoSurface>,
    cancel: CancellationToken,
}

struct Inner {
    snapshot: PlaybackSnapshot,
    output: Option<OutputResource>,
    /// Latest claimed request token.
    token: u64,
    /// Token of the request currently holding the `Loading` state.
    loading_token: Option<u64>,
    overlay: Option<OverlayLink>,
    overlay_seq: u64,
    history: PlayHistory,
}

impl Inner {
    fn output_token(&self) -> Option<u64> {
        self.output.as_ref().map(OutputResource::token)
    }

    /// Whether `token` still holds the loading state or the live output.
    fn owned_by(&self, token: u64) -> bool {
        self.loading_token == Some(token) || self.output_token() == Some(token)
    }

    /// Pause the attached video and stop its sync loop. Returns the track the
    /// overlay was showing.
    fn detach_overlay(&mut self) -> Option<String> {
        let link = self.overlay.take()?;
        link.surface.pause();
        link.cancel.cancel();
        self.snapshot.video_overlay_visible = false;
        Some(link.track_id)
    }
}

struct Shared {
    config: PlaybackConfig,
    entitlement_checker: Arc<dyn EntitlementChecker>,
    media_source: Arc<dyn MediaSource>,
    audio_output: Arc<dyn AudioOutput>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    store: SessionStore,
    video_overlay_enabled: bool,
    events: EventBus,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<PlaybackSnapshot>,
    output_gate: tokio::sync::Mutex<()>,
}

/// What the signal listener must do once the state lock is released.
enum SignalAction {
    None,
    Restart(Arc<dyn MediaElement>),
    Completed(String),
    Fail(String),
}

/// Cloneable handle to the playback session.
#[derive(Clone)]
pub struct PlaybackSession {
    shared: Arc<Shared>,
}

impl PlaybackSession {
    /// Create a session from the host capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] if `config` fails validation.
    pub fn new(core: &CoreConfig, config: PlaybackConfig, events: EventBus) -> Result<Self> {
        config.validate()?;

        let snapshot = PlaybackSnapshot::new(config.default_volume);
        let (state_tx, _) = watch::channel(snapshot.clone());

        let shared = Shared {
            entitlement_checker: Arc::clone(&core.entitlement_checker),
            media_source: Arc::clone(&core.media_source),
            audio_output: Arc::clone(&core.audio_output),
            notifier: Arc::clone(&core.notifier),
            clock: Arc::clone(&core.clock),
            store: SessionStore::new(core.persistence_store()),
            video_overlay_enabled: core.features.video_overlay,
            events,
            inner: Mutex::new(Inner {
                snapshot,
                output: None,
                token: 0,
                loading_token: None,
                overlay: None,
                overlay_seq: 0,
                history: PlayHistory::new(config.history_limit),
            }),
            state_tx,
            output_gate: tokio::sync::Mutex::new(()),
            config,
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.inner.lock().snapshot.clone()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.state_tx.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    /// Identifier of the live output element, if one is held.
    pub fn output_id(&self) -> Option<OutputId> {
        self.shared.inner.lock().output.as_ref().map(OutputResource::id)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.inner.lock().history.entries()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Play `track` from the start, replacing whatever is playing.
    ///
    /// Never returns an error: failures are reported through the notifier,
    /// the event bus and the returned [`PlayOutcome`].
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn play(&self, track: Track) -> PlayOutcome {
        let token = self.claim_token();
        debug!(token, "Play requested");

        match self.try_play(token, &track).await {
            Ok(outcome) => outcome,
            Err(PlaybackError::StaleCompletion { .. }) => {
                self.abandon(token);
                PlayOutcome::Superseded
            }
            Err(err @ PlaybackError::NotEntitled(_)) => {
                info!("Purchase required");
                self.abandon_older(token);
                self.notify(NoticeKind::Error, &err.user_message());
                self.emit(PlaybackEvent::PurchaseRequired {
                    track_id: track.id.to_string(),
                });
                PlayOutcome::NotEntitled
            }
            Err(err @ PlaybackError::EntitlementCheckFailed { .. }) => {
                warn!(error = %err, "Entitlement check failed, refusing playback");
                self.abandon_older(token);
                self.notify(NoticeKind::Error, &err.user_message());
                self.emit(PlaybackEvent::Error {
                    track_id: Some(track.id.to_string()),
                    message: err.to_string(),
                    recoverable: true,
                });
                PlayOutcome::NotEntitled
            }
            Err(err) => {
                if !self.fail(token, &err) && !self.is_current(token) {
                    self.abandon(token);
                    return PlayOutcome::Superseded;
                }
                PlayOutcome::Failed
            }
        }
    }

    async fn try_play(&self, token: u64, track: &Track) -> Result<PlayOutcome> {
        if track.requires_entitlement() {
            let answer = self
                .shared
                .entitlement_checker
                .is_entitled(track.id.as_str())
                .await;
            self.ensure_current(token)?;

            let entitled = answer.map_err(|e| PlaybackError::EntitlementCheckFailed {
                track_id: track.id.to_string(),
                message: e.to_string(),
            })?;
            if !entitled {
                return Err(PlaybackError::NotEntitled(track.id.to_string()));
            }
        }

        self.begin_loading(token, track)?;

        let uri = match &track.media_uri {
            Some(uri) => uri.clone(),
            None => {
                let resolved = self.shared.media_source.resolve_uri(track.id.as_str()).await;
                self.ensure_current(token)?;
                resolved.map_err(|e| PlaybackError::ResolutionFailure {
                    track_id: track.id.to_string(),
                    message: e.to_string(),
                })?
            }
        };

        let element = self.acquire_output(token, &uri).await?;

        let played = element.play().await;
        self.ensure_current(token)?;
        played.map_err(|e| PlaybackError::PlaybackRejected(e.to_string()))?;

        if !self.confirm_started(token)? {
            // The element reported an error while loading; already handled.
            return Ok(PlayOutcome::Failed);
        }

        info!(title = %track.title, artist = %track.artist_name, "Now playing");
        self.emit(PlaybackEvent::Started {
            track_id: track.id.to_string(),
            title: track.title.clone(),
            artist: track.artist_name.clone(),
        });
        self.notify(
            NoticeKind::Info,
            &format!("Now playing: {} - {}", track.title, track.artist_name),
        );
        self.record_play(track).await;

        Ok(PlayOutcome::Started)
    }

    /// Pause the active element. No-op unless `Playing`.
    #[instrument(skip(self))]
    pub async fn pause(&self) {
        let paused = self.with_inner(|inner| {
            if inner.snapshot.status != PlaybackStatus::Playing {
                return None;
            }
            let output = inner.output.as_ref()?;
            output.element().pause();
            inner.snapshot.status = PlaybackStatus::Paused;
            Some((
                inner.snapshot.current_track_id().unwrap_or_default().to_string(),
                inner.snapshot.position_secs,
            ))
        });

        match paused {
            Some((track_id, position)) => {
                debug!(position, "Paused");
                self.emit(PlaybackEvent::Paused {
                    track_id,
                    position_ms: secs_to_millis(position),
                });
            }
            None => debug!("Pause ignored, not playing"),
        }
    }

    /// Resume a paused track. Returns `true` once the platform confirms.
    ///
    /// Refused while the video overlay is visible.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> bool {
        let target = self.with_inner(|inner| {
            let snapshot = &inner.snapshot;
            if snapshot.status != PlaybackStatus::Paused
                || snapshot.current_track.is_none()
                || snapshot.video_overlay_visible
            {
                return None;
            }
            inner
                .output
                .as_ref()
                .map(|o| (o.id(), Arc::clone(o.element())))
        });

        let Some((output_id, element)) = target else {
            debug!("Resume ignored");
            return false;
        };

        if let Err(err) = element.play().await {
            warn!(error = %err, "Platform refused to resume");
            self.notify(NoticeKind::Error, "Unable to resume playback");
            return false;
        }

        let resumed = self.with_inner(|inner| {
            let same_output = inner.output.as_ref().map(OutputResource::id) == Some(output_id);
            if !same_output || inner.snapshot.status != PlaybackStatus::Paused {
                return None;
            }
            inner.snapshot.status = PlaybackStatus::Playing;
            Some((
                inner.snapshot.current_track_id().unwrap_or_default().to_string(),
                inner.snapshot.position_secs,
            ))
        });

        match resumed {
            Some((track_id, position)) => {
                self.emit(PlaybackEvent::Resumed {
                    track_id,
                    position_ms: secs_to_millis(position),
                });
                true
            }
            None => false,
        }
    }

    /// Move the playhead. The position is clamped to `[0, duration]`
    /// (lower bound only while the duration is unknown); NaN is ignored.
    /// Returns the applied position.
    #[instrument(skip(self))]
    pub async fn seek(&self, secs: f64) -> Option<f64> {
        if secs.is_nan() {
            return None;
        }

        let applied = self.with_inner(|inner| {
            let track_id = inner.snapshot.current_track_id()?.to_string();
            let position = inner.snapshot.clamp_position(secs);
            let target = Duration::try_from_secs_f64(position).ok()?;

            inner.snapshot.position_secs = position;
            if let Some(output) = &inner.output {
                output.element().seek(target);
            }
            Some((track_id, position, inner.snapshot.duration_secs))
        });

        let (track_id, position, duration) = applied?;
        self.emit(PlaybackEvent::PositionChanged {
            track_id,
            position_ms: secs_to_millis(position),
            duration_ms: duration.map(secs_to_millis),
        });
        Some(position)
    }

    /// Set the volume for the active element and all later ones.
    /// Returns the applied (clamped) value; NaN is ignored.
    #[instrument(skip(self))]
    pub async fn set_volume(&self, volume: f32) -> Option<f32> {
        let volume = clamp_volume(volume)?;

        self.with_inner(|inner| {
            inner.snapshot.volume = volume;
            if let Some(output) = &inner.output {
                output.element().set_volume(volume);
            }
        });
        self.emit(PlaybackEvent::VolumeChanged {
            percent: (volume * 100.0).round() as u8,
        });

        if let Err(err) = self.shared.store.save_volume(volume).await {
            warn!(error = %err, "Failed to persist volume");
        }
        Some(volume)
    }

    /// Flip looping and return the new value.
    #[instrument(skip(self))]
    pub async fn toggle_loop(&self) -> bool {
        let enabled = self.with_inner(|inner| {
            let enabled = !inner.snapshot.loop_enabled;
            inner.snapshot.loop_enabled = enabled;
            if let Some(output) = &inner.output {
                output.element().set_looping(enabled);
            }
            enabled
        });
        self.emit(PlaybackEvent::LoopToggled { enabled });

        if let Err(err) = self.shared.store.save_loop(enabled).await {
            warn!(error = %err, "Failed to persist loop flag");
        }
        enabled
    }

    /// Cancel any in-flight `play`, release the output and return to `Idle`.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let (stopped, overlay) = self.with_inner(|inner| {
            inner.token += 1;
            inner.loading_token = None;
            let overlay = inner.detach_overlay();
            let track_id = inner.snapshot.current_track_id().map(str::to_string);
            inner.output = None;
            inner.snapshot.reset();
            (track_id, overlay)
        });

        self.emit_overlay_detached(overlay);
        if let Some(track_id) = stopped {
            debug!(track_id = %track_id, "Stopped");
            self.emit(PlaybackEvent::Stopped { track_id });
        }
    }

    /// Persist the last session, then stop. Call on logout or teardown.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let last = {
            let inner = self.shared.inner.lock();
            inner
                .snapshot
                .current_track
                .clone()
                .map(|track| LastSession {
                    track,
                    position_secs: inner.snapshot.position_secs,
                })
        };

        if let Err(err) = self.shared.store.save_last_session(last.as_ref()).await {
            warn!(error = %err, "Failed to persist last session");
        }
        self.stop().await;
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Load saved volume, loop flag and history.
    #[instrument(skip(self))]
    pub async fn restore_preferences(&self) {
        let prefs = match self.shared.store.load_preferences().await {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!(error = %err, "Failed to load preferences");
                Default::default()
            }
        };
        let history = match self.shared.store.load_history().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "Failed to load play history");
                Vec::new()
            }
        };

        self.with_inner(|inner| {
            if let Some(volume) = prefs.volume {
                inner.snapshot.volume = volume;
            }
            if let Some(enabled) = prefs.loop_enabled {
                inner.snapshot.loop_enabled = enabled;
            }
            if let Some(output) = &inner.output {
                output.element().set_volume(inner.snapshot.volume);
                output.element().set_looping(inner.snapshot.loop_enabled);
            }
            inner.history = PlayHistory::from_entries(history, self.shared.config.history_limit);
        });
        debug!(?prefs, "Preferences restored");
    }

    /// Replay the track saved by [`shutdown`](Self::shutdown) and seek to
    /// where it stopped. `None` when nothing was saved.
    #[instrument(skip(self))]
    pub async fn resume_last_session(&self) -> Option<PlayOutcome> {
        let last = match self.shared.store.load_last_session().await {
            Ok(last) => last?,
            Err(err) => {
                warn!(error = %err, "Failed to load last session");
                return None;
            }
        };

        let outcome = self.play(last.track).await;
        if outcome == PlayOutcome::Started && last.position_secs > 0.0 {
            self.seek(last.position_secs).await;
        }
        Some(outcome)
    }

    pub async fn clear_history(&self) {
        self.with_inner(|inner| inner.history.clear());
        if let Err(err) = self.shared.store.save_history(&[]).await {
            warn!(error = %err, "Failed to persist cleared history");
        }
    }

    async fn record_play(&self, track: &Track) {
        let now = self.shared.clock.now();
        let entries = self.with_inner(|inner| {
            inner.history.record(track.clone(), now);
            inner.history.entries()
        });

        if let Err(err) = self.shared.store.save_history(&entries).await {
            warn!(error = %err, "Failed to persist play history");
        }
        let last = LastSession {
            track: track.clone(),
            position_secs: 0.0,
        };
        if let Err(err) = self.shared.store.save_last_session(Some(&last)).await {
            warn!(error = %err, "Failed to persist last session");
        }
    }

    // ------------------------------------------------------------------
    // Video overlay hooks
    // ------------------------------------------------------------------

    pub(crate) fn video_overlay_enabled(&self) -> bool {
        self.shared.video_overlay_enabled
    }

    /// Register `surface` as covering `track_id` and mark the overlay
    /// visible. `None` if an overlay is already attached or the track is no
    /// longer the settled current one.
    pub(crate) fn attach_overlay(
        &self,
        track_id: &str,
        surface: Arc<dyn VideoSurface>,
        cancel: CancellationToken,
    ) -> Option<u64> {
        self.with_inner(|inner| {
            if inner.overlay.is_some()
                || inner.snapshot.status == PlaybackStatus::Loading
                || inner.snapshot.current_track_id() != Some(track_id)
            {
                return None;
            }
            inner.overlay_seq += 1;
            let id = inner.overlay_seq;
            inner.overlay = Some(OverlayLink {
                id,
                track_id: track_id.to_string(),
                surface,
                cancel,
            });
            inner.snapshot.video_overlay_visible = true;
            Some(id)
        })
    }

    /// Drop the registration made by [`attach_overlay`](Self::attach_overlay).
    /// No-op if the session already detached that overlay.
    pub(crate) fn release_overlay(&self, id: u64) {
        self.with_inner(|inner| {
            if inner.overlay.as_ref().map(|link| link.id) == Some(id) {
                inner.overlay = None;
                inner.snapshot.video_overlay_visible = false;
            }
        });
    }

    fn emit_overlay_detached(&self, track_id: Option<String>) {
        if let Some(track_id) = track_id {
            debug!(track_id = %track_id, "Video overlay detached");
            let _ = self
                .shared
                .events
                .emit(CoreEvent::Video(VideoEvent::OverlayClosed {
                    track_id: Some(track_id),
                    resumed_audio: false,
                }));
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run `f` under the state lock and publish the snapshot if it changed.
    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.shared.inner.lock();
        let result = f(&mut inner);
        self.shared.state_tx.send_if_modified(|current| {
            if *current == inner.snapshot {
                false
            } else {
                *current = inner.snapshot.clone();
                true
            }
        });
        result
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.emit(CoreEvent::Playback(event));
    }

    fn notify(&self, kind: NoticeKind, message: &str) {
        self.shared.notifier.notify(kind, message);
    }

    fn claim_token(&self) -> u64 {
        let mut inner = self.shared.inner.lock();
        inner.token += 1;
        inner.token
    }

    fn is_current(&self, token: u64) -> bool {
        self.shared.inner.lock().token == token
    }

    fn ensure_current(&self, token: u64) -> Result<()> {
        if self.is_current(token) {
            Ok(())
        } else {
            Err(PlaybackError::StaleCompletion { token })
        }
    }

    /// Close any video overlay, release the previous output and enter
    /// `Loading` for `track`.
    fn begin_loading(&self, token: u64, track: &Track) -> Result<()> {
        let overlay = self.with_inner(|inner| {
            if inner.token != token {
                return Err(PlaybackError::StaleCompletion { token });
            }
            let overlay = inner.detach_overlay();
            if let Some(previous) = inner.output.take() {
                debug!(output_id = %previous.id(), "Releasing previous output");
                previous.release();
            }
            inner.loading_token = Some(token);

            let snapshot = &mut inner.snapshot;
            snapshot.current_track = Some(track.clone());
            snapshot.status = PlaybackStatus::Loading;
            snapshot.position_secs = 0.0;
            snapshot.duration_secs = track.known_duration();
            Ok(overlay)
        })?;

        self.emit_overlay_detached(overlay);
        self.emit(PlaybackEvent::Loading {
            track_id: track.id.to_string(),
        });
        Ok(())
    }

    /// Open an element for `uri` and install it as the session output.
    async fn acquire_output(&self, token: u64, uri: &str) -> Result<Arc<dyn MediaElement>> {
        let _gate = self.shared.output_gate.lock().await;
        self.ensure_current(token)?;

        debug!(uri = %strip_query(uri), "Opening output");
        let opened = self.shared.audio_output.open(uri).await;
        let element = match opened {
            Ok(element) => element,
            Err(err) => {
                self.ensure_current(token)?;
                return Err(PlaybackError::OutputUnavailable(err.to_string()));
            }
        };

        // Dropped, and therefore released, on every early return below.
        let mut resource = OutputResource::new(uri.to_string(), token, Arc::clone(&element));
        let signals = output::signal_source(
            Arc::clone(&element),
            self.shared.config.fallback_poll_interval,
        );

        self.with_inner(|inner| {
            if inner.token != token || inner.loading_token != Some(token) {
                return Err(PlaybackError::StaleCompletion { token });
            }
            element.set_volume(inner.snapshot.volume);
            element.set_looping(inner.snapshot.loop_enabled);
            // Seek issued while loading.
            if inner.snapshot.position_secs > 0.0 {
                if let Ok(target) = Duration::try_from_secs_f64(inner.snapshot.position_secs) {
                    element.seek(target);
                }
            }
            resource.attach_listener(self.spawn_listener(token, signals));
            inner.output = Some(resource);
            Ok(())
        })?;

        Ok(element)
    }

    /// Move the loading request to `Playing`. `Ok(false)` when the element
    /// failed in the meantime.
    fn confirm_started(&self, token: u64) -> Result<bool> {
        self.with_inner(|inner| {
            if inner.token != token {
                return Err(PlaybackError::StaleCompletion { token });
            }
            if inner.loading_token != Some(token) {
                return Ok(false);
            }
            inner.loading_token = None;
            inner.snapshot.status = PlaybackStatus::Playing;
            Ok(true)
        })
    }

    /// Roll back a superseded request that still holds `Loading`.
    fn abandon(&self, token: u64) {
        self.roll_back_loading(|loading| loading == token);
    }

    /// Roll back a loading request older than the refused `token`, so the
    /// session does not keep showing `Loading` for a request nobody wants.
    fn abandon_older(&self, token: u64) {
        self.roll_back_loading(|loading| loading < token);
    }

    fn roll_back_loading(&self, matches: impl FnOnce(u64) -> bool) {
        let rolled_back = self.with_inner(|inner| {
            let loading = inner.loading_token.filter(|&loading| matches(loading))?;
            inner.loading_token = None;
            if inner.output_token() == Some(loading) {
                inner.output = None;
            }
            let track_id = inner.snapshot.current_track_id().map(str::to_string);
            inner.snapshot.reset();
            Some((loading, track_id))
        });

        match rolled_back {
            Some((token, track_id)) => {
                debug!(token, "Superseded request rolled back");
                if let Some(track_id) = track_id {
                    self.emit(PlaybackEvent::Stopped { track_id });
                }
            }
            None => debug!("Superseded request discarded"),
        }
    }

    /// `Failed`, notify, release, `Idle`. Returns `false` if `token` no
    /// longer owns the session.
    fn fail(&self, token: u64, err: &PlaybackError) -> bool {
        let failed = self.with_inner(|inner| {
            if !inner.owned_by(token) {
                return None;
            }
            inner.snapshot.status = PlaybackStatus::Failed;
            Some(inner.snapshot.current_track_id().map(str::to_string))
        });
        let Some(track_id) = failed else {
            return false;
        };

        warn!(error = %err, "Playback failed");
        self.notify(NoticeKind::Error, &err.user_message());

        let overlay = self.with_inner(|inner| {
            if !inner.owned_by(token) {
                return None;
            }
            inner.loading_token = None;
            inner.output = None;
            let overlay = inner.detach_overlay();
            inner.snapshot.reset();
            overlay
        });
        self.emit_overlay_detached(overlay);

        self.emit(PlaybackEvent::Error {
            track_id,
            message: err.to_string(),
            recoverable: err.is_transient(),
        });
        true
    }

    fn spawn_listener(&self, token: u64, mut signals: MediaSignalStream) -> JoinHandle<()> {
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                PlaybackSession { shared }.handle_signal(token, signal).await;
            }
            debug!(token, "Signal stream closed");
        })
    }

    async fn handle_signal(&self, token: u64, signal: MediaSignal) {
        let mut events = Vec::new();

        let action = self.with_inner(|inner| {
            if inner.output_token() != Some(token) {
                return SignalAction::None;
            }
            let Some(track_id) = inner.snapshot.current_track_id().map(str::to_string) else {
                return SignalAction::None;
            };
            let snapshot = &mut inner.snapshot;

            match signal {
                MediaSignal::TimeUpdate(position) => {
                    let position = snapshot.clamp_position(position.as_secs_f64());
                    if position != snapshot.position_secs {
                        snapshot.position_secs = position;
                        events.push(PlaybackEvent::PositionChanged {
                            track_id,
                            position_ms: secs_to_millis(position),
                            duration_ms: snapshot.duration_secs.map(secs_to_millis),
                        });
                    }
                    SignalAction::None
                }
                MediaSignal::MetadataLoaded { duration } => {
                    let duration = duration.as_secs_f64();
                    if duration > 0.0 && snapshot.duration_secs != Some(duration) {
                        snapshot.duration_secs = Some(duration);
                        snapshot.position_secs = snapshot.position_secs.min(duration);
                        events.push(PlaybackEvent::DurationResolved {
                            track_id,
                            duration_ms: secs_to_millis(duration),
                        });
                    }
                    SignalAction::None
                }
                MediaSignal::Ended if snapshot.status.is_active() => {
                    if snapshot.loop_enabled {
                        snapshot.status = PlaybackStatus::Playing;
                        snapshot.position_secs = 0.0;
                        events.push(PlaybackEvent::Looped { track_id });
                        inner
                            .output
                            .as_ref()
                            .map(|o| SignalAction::Restart(Arc::clone(o.element())))
                            .unwrap_or(SignalAction::None)
                    } else {
                        snapshot.status = PlaybackStatus::Ended;
                        SignalAction::Completed(track_id)
                    }
                }
                MediaSignal::Ended => SignalAction::None,
                MediaSignal::Error(message) => SignalAction::Fail(message),
            }
        });

        for event in events {
            self.emit(event);
        }

        match action {
            SignalAction::None => {}
            SignalAction::Restart(element) => {
                debug!("Looping track");
                element.seek(Duration::ZERO);
                if let Err(err) = element.play().await {
                    self.fail(token, &PlaybackError::PlaybackRejected(err.to_string()));
                }
            }
            SignalAction::Completed(track_id) => {
                self.with_inner(|inner| {
                    if inner.output_token() == Some(token)
                        && inner.snapshot.status == PlaybackStatus::Ended
                    {
                        inner.snapshot.status = PlaybackStatus::Idle;
                        inner.snapshot.position_secs = 0.0;
                        if let Some(output) = &inner.output {
                            output.element().seek(Duration::ZERO);
                        }
                    }
                });
                debug!(track_id = %track_id, "Track completed");
                self.emit(PlaybackEvent::Completed { track_id });
            }
            SignalAction::Fail(message) => {
                self.fail(token, &PlaybackError::PlaybackRejected(message));
            }
        }
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("PlaybackSession")
            .field("status", &inner.snapshot.status)
            .field("track", &inner.snapshot.current_track_id())
            .field("output", &inner.output)
            .field("token", &inner.token)
            .finish()
    }
}

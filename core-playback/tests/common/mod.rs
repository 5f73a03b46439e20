//! Shared fakes and mocks for the playback scenario tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_desktop::MemorySettingsStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioOutput, BridgeError, EntitlementChecker, MediaElement, MediaSignal, MediaSignalStream,
    MediaSource, NoticeKind, Notifier, SettingsStore, VideoSurface,
};
use core_playback::{PlaybackConfig, PlaybackSession, PlaybackSnapshot, Track};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use futures::channel::mpsc;
use futures::StreamExt;
use mockall::mock;
use parking_lot::Mutex;
use tokio::sync::oneshot;

// ============================================================================
// Mocks
// ============================================================================

mock! {
    pub Entitlement {}

    #[async_trait]
    impl EntitlementChecker for Entitlement {
        async fn is_entitled(&self, track_id: &str) -> BridgeResult<bool>;
    }
}

mock! {
    pub Catalog {}

    #[async_trait]
    impl MediaSource for Catalog {
        async fn resolve_uri(&self, track_id: &str) -> BridgeResult<String>;
    }
}

mock! {
    pub Toaster {}

    impl Notifier for Toaster {
        fn notify(&self, kind: NoticeKind, message: &str);
    }
}

// ============================================================================
// Simple collaborators
// ============================================================================

/// Entitles every track.
pub struct AllowAll;

#[async_trait]
impl EntitlementChecker for AllowAll {
    async fn is_entitled(&self, _track_id: &str) -> BridgeResult<bool> {
        Ok(true)
    }
}

/// Entitles every track after a delay.
pub struct SlowEntitlement(pub Duration);

#[async_trait]
impl EntitlementChecker for SlowEntitlement {
    async fn is_entitled(&self, _track_id: &str) -> BridgeResult<bool> {
        tokio::time::sleep(self.0).await;
        Ok(true)
    }
}

/// Resolves `id` to `https://cdn.test/{id}.mp3`.
pub struct StaticCatalog;

#[async_trait]
impl MediaSource for StaticCatalog {
    async fn resolve_uri(&self, track_id: &str) -> BridgeResult<String> {
        Ok(format!("https://cdn.test/{}.mp3", track_id))
    }
}

/// Resolves like [`StaticCatalog`] after a delay.
pub struct SlowCatalog(pub Duration);

#[async_trait]
impl MediaSource for SlowCatalog {
    async fn resolve_uri(&self, track_id: &str) -> BridgeResult<String> {
        tokio::time::sleep(self.0).await;
        StaticCatalog.resolve_uri(track_id).await
    }
}

/// Never answers.
pub struct PendingCatalog;

#[async_trait]
impl MediaSource for PendingCatalog {
    async fn resolve_uri(&self, _track_id: &str) -> BridgeResult<String> {
        futures::future::pending().await
    }
}

/// Records every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices.lock().clone()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices.lock().iter().filter(|(k, _)| *k == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        self.notices.lock().push((kind, message.to_string()));
    }
}

// ============================================================================
// Fake audio output
// ============================================================================

/// Holds a gated `play()` call until released.
pub struct PlayGate(oneshot::Sender<Result<(), String>>);

impl PlayGate {
    pub fn release(self) {
        let _ = self.0.send(Ok(()));
    }

    pub fn reject(self, reason: &str) {
        let _ = self.0.send(Err(reason.to_string()));
    }
}

/// Audio output that tracks how many elements are live at once.
pub struct FakeOutput {
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    elements: Mutex<Vec<Arc<FakeElement>>>,
    pending_gates: Mutex<VecDeque<oneshot::Receiver<Result<(), String>>>>,
    fail_open: AtomicBool,
    reject_play: AtomicBool,
    native_signals: bool,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::with_native_signals(true)
    }

    /// `native_signals = false` models an engine without progress events.
    pub fn with_native_signals(native_signals: bool) -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
            elements: Mutex::new(Vec::new()),
            pending_gates: Mutex::new(VecDeque::new()),
            fail_open: AtomicBool::new(false),
            reject_play: AtomicBool::new(false),
            native_signals,
        }
    }

    /// The next opened element's first `play()` waits for the returned gate.
    pub fn gate_next_play(&self) -> PlayGate {
        let (tx, rx) = oneshot::channel();
        self.pending_gates.lock().push_back(rx);
        PlayGate(tx)
    }

    pub fn fail_next_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    /// The next opened element rejects its first `play()`.
    pub fn reject_next_play(&self) {
        self.reject_play.store(true, Ordering::SeqCst);
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.elements.lock().len()
    }

    pub fn element(&self, index: usize) -> Arc<FakeElement> {
        Arc::clone(&self.elements.lock()[index])
    }

    pub fn last_element(&self) -> Arc<FakeElement> {
        let elements = self.elements.lock();
        Arc::clone(elements.last().expect("no element opened"))
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn open(&self, uri: &str) -> BridgeResult<Arc<dyn MediaElement>> {
        if self.fail_open.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("no audio device".to_string()));
        }

        let now_live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(now_live, Ordering::SeqCst);

        let (signal_tx, signal_rx) = mpsc::unbounded();
        let element = Arc::new(FakeElement {
            uri: uri.to_string(),
            live: Arc::clone(&self.live),
            detached: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            position: Mutex::new(Duration::ZERO),
            duration: Mutex::new(None),
            volume: Mutex::new(1.0),
            looping: AtomicBool::new(false),
            play_calls: AtomicUsize::new(0),
            play_gate: Mutex::new(self.pending_gates.lock().pop_front()),
            reject_play: AtomicBool::new(self.reject_play.swap(false, Ordering::SeqCst)),
            signal_tx,
            signal_rx: Mutex::new(if self.native_signals {
                Some(signal_rx)
            } else {
                None
            }),
        });
        self.elements.lock().push(Arc::clone(&element));
        Ok(element as Arc<dyn MediaElement>)
    }
}

/// In-memory media element with injectable signals.
pub struct FakeElement {
    pub uri: String,
    live: Arc<AtomicUsize>,
    detached: AtomicBool,
    playing: AtomicBool,
    position: Mutex<Duration>,
    duration: Mutex<Option<Duration>>,
    volume: Mutex<f32>,
    looping: AtomicBool,
    play_calls: AtomicUsize,
    play_gate: Mutex<Option<oneshot::Receiver<Result<(), String>>>>,
    reject_play: AtomicBool,
    signal_tx: mpsc::UnboundedSender<MediaSignal>,
    signal_rx: Mutex<Option<mpsc::UnboundedReceiver<MediaSignal>>>,
}

impl FakeElement {
    /// Deliver a native signal to the session.
    pub fn emit(&self, signal: MediaSignal) {
        let _ = self.signal_tx.unbounded_send(signal);
    }

    /// Make the next `play()` fail.
    pub fn reject_next_play(&self) {
        self.reject_play.store(true, Ordering::SeqCst);
    }

    pub fn set_position(&self, secs: f64) {
        *self.position.lock() = Duration::from_secs_f64(secs);
    }

    pub fn set_duration(&self, secs: f64) {
        *self.duration.lock() = Some(Duration::from_secs_f64(secs));
    }

    pub fn position_secs(&self) -> f64 {
        self.position.lock().as_secs_f64()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaElement for FakeElement {
    async fn play(&self) -> BridgeResult<()> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.play_gate.lock().take();
        if let Some(gate) = gate {
            match gate.await {
                Ok(Ok(())) => {}
                Ok(Err(reason)) => return Err(BridgeError::MediaRejected(reason)),
                Err(_) => return Err(BridgeError::MediaRejected("gate dropped".to_string())),
            }
        }

        if self.reject_play.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::MediaRejected("autoplay blocked".to_string()));
        }
        if self.is_detached() {
            return Err(BridgeError::MediaRejected("element detached".to_string()));
        }

        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn seek(&self, position: Duration) {
        *self.position.lock() = position;
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume;
    }

    fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::SeqCst);
    }

    fn position(&self) -> Duration {
        *self.position.lock()
    }

    fn duration(&self) -> Option<Duration> {
        *self.duration.lock()
    }

    fn signals(&self) -> Option<MediaSignalStream> {
        self.signal_rx.lock().take().map(|rx| rx.boxed())
    }

    fn detach(&self) {
        if !self.detached.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// Fake video surface
// ============================================================================

#[derive(Default)]
pub struct FakeSurface {
    position: Mutex<Duration>,
    playing: AtomicBool,
    play_calls: AtomicUsize,
    reject_play: AtomicBool,
}

impl FakeSurface {
    pub fn set_position(&self, secs: f64) {
        *self.position.lock() = Duration::from_secs_f64(secs);
    }

    pub fn position_secs(&self) -> f64 {
        self.position.lock().as_secs_f64()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn reject_next_play(&self) {
        self.reject_play.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoSurface for FakeSurface {
    async fn play(&self) -> BridgeResult<()> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_play.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::MediaRejected("video decode error".to_string()));
        }
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn seek(&self, position: Duration) {
        *self.position.lock() = position;
    }

    fn position(&self) -> Duration {
        *self.position.lock()
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct HarnessOptions {
    pub entitlement: Arc<dyn EntitlementChecker>,
    pub catalog: Arc<dyn MediaSource>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub output: Arc<FakeOutput>,
    pub settings: Option<Arc<MemorySettingsStore>>,
    pub video_overlay: bool,
    pub config: PlaybackConfig,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            entitlement: Arc::new(AllowAll),
            catalog: Arc::new(StaticCatalog),
            notifier: None,
            output: Arc::new(FakeOutput::new()),
            settings: None,
            video_overlay: true,
            config: PlaybackConfig::default(),
        }
    }
}

pub struct Harness {
    pub session: PlaybackSession,
    pub output: Arc<FakeOutput>,
    pub notices: Arc<RecordingNotifier>,
    pub events: EventBus,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(HarnessOptions::default())
    }

    pub fn with(options: HarnessOptions) -> Self {
        let notices = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = match options.notifier {
            Some(notifier) => notifier,
            None => notices.clone(),
        };

        let mut builder = CoreConfig::builder()
            .entitlement_checker(options.entitlement)
            .media_source(options.catalog)
            .audio_output(options.output.clone())
            .notifier(notifier)
            .enable_video_overlay(options.video_overlay);
        if let Some(settings) = options.settings {
            let settings: Arc<dyn SettingsStore> = settings;
            builder = builder.settings_store(settings).enable_persist_session(true);
        }
        let core = builder.build().expect("valid core config");

        let events = EventBus::new(256);
        let session =
            PlaybackSession::new(&core, options.config, events.clone()).expect("valid session");

        Self {
            session,
            output: options.output,
            notices,
            events,
        }
    }

    /// Wait until the published snapshot satisfies `predicate`.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&PlaybackSnapshot) -> bool,
    ) -> PlaybackSnapshot {
        let mut rx = self.session.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for playback state")
            .expect("session dropped")
            .clone();
        snapshot
    }

    /// Wait until the output has opened `count` elements.
    pub async fn wait_for_opened(&self, count: usize) {
        let output = Arc::clone(&self.output);
        eventually(move || output.opened() >= count).await;
    }
}

pub fn free_track(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), "Test Artist").with_duration_secs(180.0)
}

pub fn priced_track(id: &str) -> Track {
    free_track(id).with_price(1.99)
}

/// Poll `check` until it holds, yielding to other tasks in between.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition never became true");
}

/// Every event currently buffered in `rx`.
pub fn drain(rx: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

//! # Playback Session Demo
//!
//! Drives a [`PlaybackSession`] against an in-memory "speaker" that advances
//! its playhead on a timer. The speaker emits no native signals, so the
//! session falls back to polling it.
//!
//! Run with: `cargo run --example session_demo --package core-playback`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_desktop::{MemorySettingsStore, TracingNotifier};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::time::LogLevel;
use bridge_traits::{
    AudioOutput, EntitlementChecker, MediaElement, MediaSignalStream, MediaSource,
};
use core_playback::{format_clock, PlayOutcome, PlaybackConfig, PlaybackSession, Track};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

// ============================================================================
// In-memory host
// ============================================================================

/// Treats the "premium" track as never bought.
struct DemoStore;

#[async_trait]
impl EntitlementChecker for DemoStore {
    async fn is_entitled(&self, track_id: &str) -> BridgeResult<bool> {
        Ok(track_id != "premium")
    }
}

#[async_trait]
impl MediaSource for DemoStore {
    async fn resolve_uri(&self, track_id: &str) -> BridgeResult<String> {
        Ok(format!("memory://tracks/{}?signature=demo", track_id))
    }
}

/// Opens speakers whose tracks last `length`.
struct DemoOutput {
    length: Duration,
}

#[async_trait]
impl AudioOutput for DemoOutput {
    async fn open(&self, _uri: &str) -> BridgeResult<Arc<dyn MediaElement>> {
        Ok(Arc::new(Speaker {
            length: self.length,
            position: Arc::new(Mutex::new(Duration::ZERO)),
            playing: Arc::new(AtomicBool::new(false)),
            ticker: Mutex::new(None),
        }))
    }
}

struct Speaker {
    length: Duration,
    position: Arc<Mutex<Duration>>,
    playing: Arc<AtomicBool>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl MediaElement for Speaker {
    async fn play(&self) -> BridgeResult<()> {
        self.playing.store(true, Ordering::SeqCst);

        let mut ticker = self.ticker.lock();
        if ticker.is_none() {
            let position = Arc::clone(&self.position);
            let playing = Arc::clone(&self.playing);
            let length = self.length;
            *ticker = Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(100));
                loop {
                    interval.tick().await;
                    if playing.load(Ordering::SeqCst) {
                        let mut position = position.lock();
                        *position = (*position + Duration::from_millis(100)).min(length);
                    }
                }
            }));
        }
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn seek(&self, position: Duration) {
        *self.position.lock() = position.min(self.length);
    }

    fn set_volume(&self, _volume: f32) {}

    fn set_looping(&self, _looping: bool) {}

    fn position(&self) -> Duration {
        *self.position.lock()
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.length)
    }

    fn signals(&self) -> Option<MediaSignalStream> {
        None
    }

    fn detach(&self) {
        self.playing.store(false, Ordering::SeqCst);
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.abort();
        }
    }
}

// ============================================================================
// Demo
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;

    let host = Arc::new(DemoStore);
    let core = CoreConfig::builder()
        .entitlement_checker(host.clone())
        .media_source(host)
        .audio_output(Arc::new(DemoOutput {
            length: Duration::from_secs(2),
        }))
        .notifier(Arc::new(TracingNotifier::new()))
        .settings_store(Arc::new(MemorySettingsStore::new()))
        .enable_persist_session(true)
        .build()?;

    let events = EventBus::default();
    let mut stream = EventStream::new(events.subscribe())
        .filter(|event| {
            !matches!(
                event,
                CoreEvent::Playback(PlaybackEvent::PositionChanged { .. })
            )
        });
    tokio::spawn(async move {
        while let Ok(event) = stream.recv().await {
            info!(event = event.description(), "Event");
        }
    });

    let config = PlaybackConfig {
        fallback_poll_interval: Duration::from_millis(200),
        ..PlaybackConfig::default()
    };
    let session = PlaybackSession::new(&core, config, events)?;
    session.restore_preferences().await;

    let premium = Track::new("premium", "Gold Record", "The Paywalls").with_price(1.99);
    assert_eq!(session.play(premium).await, PlayOutcome::NotEntitled);

    let track = Track::new("intro", "Intro", "Demo Band").with_duration_secs(2.0);
    assert_eq!(session.play(track).await, PlayOutcome::Started);
    session.set_volume(0.6).await;

    let mut state = session.subscribe();
    while state.changed().await.is_ok() {
        let snapshot = state.borrow_and_update().clone();
        info!(
            status = ?snapshot.status,
            position = %format_clock(snapshot.position_secs),
            "Tick"
        );
        if !snapshot.status.is_active() {
            break;
        }
    }

    session.shutdown().await;
    Ok(())
}

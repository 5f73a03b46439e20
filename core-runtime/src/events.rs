//! # Event Bus System
//!
//! Typed, broadcast-based events for UI layers and other observers of the
//! playback core, built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event types**: [`CoreEvent`] wraps one enum per domain
//!   ([`PlaybackEvent`], [`VideoEvent`])
//! - **[`EventBus`]**: cloneable publisher handle
//! - **[`EventStream`]**: receiver wrapper with an optional predicate
//!
//! ```text
//! ┌─────────────────┐  emit   ┌──────────┐  subscribe  ┌────────────┐
//! │ PlaybackSession ├────────>│          ├────────────>│ Now-playing│
//! └─────────────────┘         │ EventBus │             │ bar        │
//! ┌─────────────────┐  emit   │          │  subscribe  ├────────────┤
//! │ VideoOverlay    ├────────>│          ├────────────>│ Analytics  │
//! └─────────────────┘         └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut stream = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Playback(_)));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped {
//!     track_id: "42".to_string(),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback stopped");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep reading.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; publishers ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Position updates arrive several times a second, so slow subscribers lag
/// rather than block publishers.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Video(VideoEvent),
}

impl CoreEvent {
    /// Human-readable summary, suitable for logs.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Video(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::PurchaseRequired { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Stopped { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Video(VideoEvent::DriftCorrected { .. }) => EventSeverity::Debug,
            CoreEvent::Video(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity, ordered from least to most important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Audio session lifecycle. Positions are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A play request passed entitlement and is acquiring media.
    Loading { track_id: String },
    Started {
        track_id: String,
        title: String,
        artist: String,
    },
    Paused {
        track_id: String,
        position_ms: u64,
    },
    Resumed {
        track_id: String,
        position_ms: u64,
    },
    Stopped { track_id: String },
    /// The track reached its end with looping off.
    Completed { track_id: String },
    /// The track reached its end and restarted because looping is on.
    Looped { track_id: String },
    PositionChanged {
        track_id: String,
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    /// The media reported its real duration.
    DurationResolved {
        track_id: String,
        duration_ms: u64,
    },
    VolumeChanged { percent: u8 },
    LoopToggled { enabled: bool },
    /// A priced track was requested without a purchase.
    PurchaseRequired { track_id: String },
    Error {
        track_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Loading track",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::Looped { .. } => "Track restarted",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::DurationResolved { .. } => "Track duration resolved",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::LoopToggled { .. } => "Loop toggled",
            PlaybackEvent::PurchaseRequired { .. } => "Purchase required",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Video Events
// ============================================================================

/// Full-screen video overlay lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum VideoEvent {
    OverlayOpened {
        track_id: String,
        position_ms: u64,
    },
    OverlayClosed {
        track_id: Option<String>,
        resumed_audio: bool,
    },
    /// The video drifted past tolerance and was re-aligned to the audio.
    DriftCorrected {
        track_id: String,
        drift_ms: u64,
    },
}

impl VideoEvent {
    fn description(&self) -> &str {
        match self {
            VideoEvent::OverlayOpened { .. } => "Video overlay opened",
            VideoEvent::OverlayClosed { .. } => "Video overlay closed",
            VideoEvent::DriftCorrected { .. } => "Video drift corrected",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cloneable publisher; every clone shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; returns the number of receivers it reached.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events rejected by its predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive; `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

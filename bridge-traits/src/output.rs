//! Audio output bridge: the platform media element.
//!
//! On the web this wraps an `HTMLAudioElement`; native hosts wrap whatever
//! engine they drive. The core acquires one element per track through
//! [`AudioOutput::open`] and never re-points an element at a different
//! source.
//!
//! ## Signals
//!
//! Elements report progress through [`MediaElement::signals`], a stream of
//! [`MediaSignal`]s mirroring the native `timeupdate`, `loadedmetadata`,
//! `ended` and `error` events. The stream is taken once per element. Hosts
//! whose engine has no such events return `None`, and the core falls back
//! to sampling [`MediaElement::position`] on a timer.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::Result,
    platform::{PlatformSendSync, PlatformStream},
};

/// Native notification emitted by a media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSignal {
    /// Playback position advanced (or jumped after a seek).
    TimeUpdate(Duration),
    /// The media header was parsed and the real duration is known.
    MetadataLoaded { duration: Duration },
    /// Playback reached the end of the media.
    Ended,
    /// The element failed while loading or decoding.
    Error(String),
}

/// Stream of [`MediaSignal`]s for a single element.
pub type MediaSignalStream = PlatformStream<MediaSignal>;

/// Factory for media elements.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioOutput: PlatformSendSync {
    /// Create a new element bound to `uri`. The element starts paused.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot allocate an element or the URI is
    /// rejected outright.
    async fn open(&self, uri: &str) -> Result<Arc<dyn MediaElement>>;
}

/// A single platform audio element.
///
/// Control calls other than [`play`](MediaElement::play) are synchronous
/// because the platform applies them immediately.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaElement: PlatformSendSync {
    /// Start or resume playback. Resolves once the platform confirms
    /// playback actually started.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MediaRejected`](crate::error::BridgeError::MediaRejected)
    /// when the platform refuses to play (autoplay policy, decode failure,
    /// network error).
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the position.
    fn pause(&self);

    /// Move the playhead to an absolute position.
    fn seek(&self, position: Duration);

    /// Set the gain, normalized to `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    /// Enable or disable native looping.
    fn set_looping(&self, looping: bool);

    /// Current playhead position.
    fn position(&self) -> Duration;

    /// Media duration, once the platform knows it.
    fn duration(&self) -> Option<Duration>;

    /// Take the element's signal stream. Returns `None` if the platform
    /// emits no progress events or the stream was already taken.
    fn signals(&self) -> Option<MediaSignalStream>;

    /// Stop loading and drop the native source. The element is unusable
    /// afterwards.
    fn detach(&self);
}

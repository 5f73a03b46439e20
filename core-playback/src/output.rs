//! Exclusive ownership of the platform audio element.
//!
//! An [`OutputResource`] wraps one [`MediaElement`] together with the task
//! consuming its signals. Dropping it stops the task, pauses the element and
//! detaches its source, so releasing twice cannot be expressed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{MediaElement, MediaSignal, MediaSignalStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use uuid::Uuid;

/// Identifier of one acquired output element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputId(Uuid);

impl OutputId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OutputId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The live audio element for the current track.
pub struct OutputResource {
    id: OutputId,
    uri: String,
    token: u64,
    element: Arc<dyn MediaElement>,
    listener: Option<JoinHandle<()>>,
}

impl OutputResource {
    pub(crate) fn new(uri: String, token: u64, element: Arc<dyn MediaElement>) -> Self {
        let resource = Self {
            id: OutputId::new(),
            uri,
            token,
            element,
            listener: None,
        };
        debug!(output_id = %resource.id, token, "Acquired output");
        resource
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Request token that acquired this element.
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn element(&self) -> &Arc<dyn MediaElement> {
        &self.element
    }

    pub(crate) fn attach_listener(&mut self, listener: JoinHandle<()>) {
        if let Some(previous) = self.listener.replace(listener) {
            previous.abort();
        }
    }

    /// Stop and detach the element.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for OutputResource {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.element.pause();
        self.element.detach();
        debug!(output_id = %self.id, token = self.token, "Released output");
    }
}

impl fmt::Debug for OutputResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputResource")
            .field("id", &self.id)
            .field("uri", &core_runtime::logging::strip_query(&self.uri))
            .field("token", &self.token)
            .field("listening", &self.listener.is_some())
            .finish()
    }
}

/// Signals for `element`: its native stream when it has one, otherwise a
/// stream sampled from `position()`/`duration()` every `poll_interval`.
pub(crate) fn signal_source(
    element: Arc<dyn MediaElement>,
    poll_interval: Duration,
) -> MediaSignalStream {
    match element.signals() {
        Some(stream) => stream,
        None => {
            debug!(
                interval_ms = poll_interval.as_millis() as u64,
                "Element has no signal stream, polling"
            );
            polled_signals(element, poll_interval)
        }
    }
}

struct PollState {
    element: Arc<dyn MediaElement>,
    interval: tokio::time::Interval,
    reported_duration: Option<Duration>,
    ended: bool,
    pending: Vec<MediaSignal>,
}

fn polled_signals(element: Arc<dyn MediaElement>, poll_interval: Duration) -> MediaSignalStream {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let state = PollState {
        element,
        interval,
        reported_duration: None,
        ended: false,
        pending: Vec::new(),
    };

    let stream = futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(signal) = state.pending.pop() {
                return Some((signal, state));
            }

            state.interval.tick().await;
            state.pending = sample(&mut state);
            state.pending.reverse();
        }
    });

    #[cfg(not(target_arch = "wasm32"))]
    return stream.boxed();

    #[cfg(target_arch = "wasm32")]
    return stream.boxed_local();
}

/// Signals implied by one sample, in emission order.
fn sample(state: &mut PollState) -> Vec<MediaSignal> {
    let mut signals = Vec::new();
    let position = state.element.position();
    let duration = state.element.duration();

    if let Some(duration) = duration {
        if state.reported_duration != Some(duration) {
            state.reported_duration = Some(duration);
            signals.push(MediaSignal::MetadataLoaded { duration });
        }
    }

    signals.push(MediaSignal::TimeUpdate(position));

    match duration {
        Some(duration) if position >= duration && !duration.is_zero() => {
            if !state.ended {
                state.ended = true;
                signals.push(MediaSignal::Ended);
            }
        }
        _ => state.ended = false,
    }

    signals
}

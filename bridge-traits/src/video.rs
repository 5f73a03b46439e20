//! Video surface bridge used by the full-screen video overlay.

use std::time::Duration;

use crate::{error::Result, platform::PlatformSendSync};

/// A platform video element showing the current track's video.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait VideoSurface: PlatformSendSync {
    /// Start playback; resolves once the platform confirms it.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the position.
    fn pause(&self);

    /// Move the playhead to an absolute position.
    fn seek(&self, position: Duration);

    /// Current playhead position.
    fn position(&self) -> Duration;
}

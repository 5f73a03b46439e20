//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the host
//! application. Each trait represents a capability that the core requires but
//! that is implemented differently per platform (browser, desktop, mobile).
//!
//! ## Traits
//!
//! ### Catalog services
//! - [`EntitlementChecker`](catalog::EntitlementChecker) - Purchase check for priced tracks
//! - [`MediaSource`](catalog::MediaSource) - Track id to streamable URI
//!
//! ### Media
//! - [`AudioOutput`](output::AudioOutput) - Allocates platform audio elements
//! - [`MediaElement`](output::MediaElement) - Controls one element and reports its signals
//! - [`VideoSurface`](video::VideoSurface) - Video element driven by the overlay
//!
//! ### User interface & storage
//! - [`Notifier`](notify::Notifier) - Toast/alert messages
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert platform errors into it with an actionable
//! message; the core decides how each failure is surfaced to the user.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` on native targets (see
//! [`platform`]) so implementations can be shared across async tasks. On
//! `wasm32` the bounds are relaxed because browser objects are single-threaded.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::catalog::MediaSource;
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct SongApi {
//!     base_url: String,
//! }
//!
//! #[async_trait]
//! impl MediaSource for SongApi {
//!     async fn resolve_uri(&self, track_id: &str) -> Result<String> {
//!         Ok(format!("{}/songs/{}/audio", self.base_url, track_id))
//!     }
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod notify;
pub mod output;
pub mod platform;
pub mod storage;
pub mod time;
pub mod video;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{EntitlementChecker, MediaSource};
pub use notify::{NoticeKind, Notifier};
pub use output::{AudioOutput, MediaElement, MediaSignal, MediaSignalStream};
pub use storage::SettingsStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use video::VideoSurface;

//! # Playback Session Core
//!
//! Decides what plays now and keeps every observer consistent with it.
//!
//! ## Overview
//!
//! - [`PlaybackSession`]: entitlement-gated play requests, one output
//!   element at a time, pause/resume/seek/volume/loop, progress reporting
//! - [`VideoOverlay`]: full-screen video kept in step with the audio
//! - [`PlayHistory`] and [`SessionStore`]: recently played tracks and
//!   preferences persisted through the host settings store
//!
//! Host capabilities (entitlement, media resolution, audio and video
//! elements, notifications, storage) come from `bridge-traits` through
//! [`core_runtime::config::CoreConfig`].

pub mod config;
pub mod error;
pub mod history;
pub mod output;
pub mod persistence;
pub mod session;
pub mod state;
pub mod track;
pub mod video;

pub use config::PlaybackConfig;
pub use error::{PlaybackError, Result};
pub use history::{HistoryEntry, PlayHistory};
pub use output::{OutputId, OutputResource};
pub use persistence::{LastSession, SessionStore, StoredPreferences};
pub use session::PlaybackSession;
pub use state::{PlayOutcome, PlaybackSnapshot, PlaybackStatus};
pub use track::{format_clock, parse_clock_duration, Track, TrackId};
pub use video::{SyncOutcome, VideoOverlay};

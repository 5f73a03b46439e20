//! # Core Runtime
//!
//! Foundational infrastructure shared by the playback core:
//! - Logging and tracing setup ([`logging`])
//! - Host capability configuration ([`config`])
//! - Typed event broadcasting ([`events`])

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, PlaybackEvent, VideoEvent};

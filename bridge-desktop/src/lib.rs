//! # Desktop Bridge Implementations
//!
//! Default implementations of host bridge traits for desktop builds and tests.
//!
//! ## Overview
//!
//! - `SettingsStore` as an in-memory map with optional JSON-file persistence
//! - `Notifier` forwarding user notices to `tracing`
//!
//! Media output, catalog services and video surfaces are inherently
//! host-specific and are not shimmed here.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemorySettingsStore, TracingNotifier};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = MemorySettingsStore::open("settings.json".into()).await.unwrap();
//!     let notifier = TracingNotifier::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod notifier;
mod settings;

pub use notifier::TracingNotifier;
pub use settings::MemorySettingsStore;

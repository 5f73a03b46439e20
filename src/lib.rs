//! Workspace facade crate.
//!
//! Re-exports the workspace crates so host applications can depend on
//! `melodia-workspace` alone. The `desktop-shims` feature (on by default)
//! pulls in the ready-made host adapters from `bridge-desktop` and lets
//! `CoreConfig` fall back to them when a capability is not injected.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

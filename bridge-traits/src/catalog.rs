//! Catalog-side collaborators: purchase entitlement and media resolution.
//!
//! Both map onto the host's REST service layer (order and song endpoints).
//! The core only consumes the answers; transport, authentication and retry
//! policy belong to the host implementation.

use crate::{error::Result, platform::PlatformSendSync};

/// Answers whether the signed-in user may play a priced track.
///
/// An `Err` means the question could not be answered (network failure,
/// expired session). Callers must treat it as "not entitled".
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::EntitlementChecker;
///
/// struct OrderApi { client: reqwest::Client }
///
/// #[async_trait::async_trait]
/// impl EntitlementChecker for OrderApi {
///     async fn is_entitled(&self, track_id: &str) -> Result<bool> {
///         // GET /orders/check-song-paid/{id}/ -> { "has_paid": bool }
///         todo!()
///     }
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait EntitlementChecker: PlatformSendSync {
    /// Returns `Ok(true)` when a paid purchase record exists for the track.
    async fn is_entitled(&self, track_id: &str) -> Result<bool>;
}

/// Resolves a track identifier to a streamable URI.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaSource: PlatformSendSync {
    /// Resolve the audio URI for `track_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the track is unknown or the service is unreachable.
    async fn resolve_uri(&self, track_id: &str) -> Result<String>;
}

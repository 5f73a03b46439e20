//! # Playback Error Types
//!
//! Errors raised inside the playback session. They are propagated with `?`
//! internally and converted into state transitions and user notices at the
//! session boundary; UI callers only see a [`PlayOutcome`](crate::PlayOutcome).

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Entitlement Errors
    // ========================================================================
    /// The user has not purchased this priced track.
    #[error("Purchase required to play track {0}")]
    NotEntitled(String),

    /// The entitlement service could not answer; treated as not entitled.
    #[error("Could not verify purchase for track {track_id}: {message}")]
    EntitlementCheckFailed { track_id: String, message: String },

    // ========================================================================
    // Media Errors
    // ========================================================================
    /// The track's media URI could not be resolved.
    #[error("Could not resolve media for track {track_id}: {message}")]
    ResolutionFailure { track_id: String, message: String },

    /// The platform refused to start or continue playback.
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// The host could not allocate an output element.
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// An async step finished after a newer request replaced it.
    #[error("Request {token} was superseded")]
    StaleCompletion { token: u64 },

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// A configuration value is out of range or a feature is disabled.
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing persisted session data failed.
    #[error("Session persistence failed: {0}")]
    Persistence(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::EntitlementCheckFailed { .. }
            | PlaybackError::ResolutionFailure { .. }
            | PlaybackError::OutputUnavailable(_) => true,
            PlaybackError::Bridge(err) => err.is_network(),
            _ => false,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::NotEntitled(_) => "Please purchase this song to play it".to_string(),
            PlaybackError::EntitlementCheckFailed { .. } => {
                "Could not verify your purchase. Please try again".to_string()
            }
            PlaybackError::ResolutionFailure { .. } | PlaybackError::OutputUnavailable(_) => {
                "This song is not available right now".to_string()
            }
            PlaybackError::PlaybackRejected(_) | PlaybackError::Bridge(_) => {
                "Unable to play this song".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

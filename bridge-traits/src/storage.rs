//! Key-Value Storage Abstraction
//!
//! Hosts persist small preferences (volume, loop flag, the last played track)
//! through this trait. Web hosts typically back it with `localStorage`,
//! desktop hosts with a settings file or an embedded database.

use async_trait::async_trait;

use crate::error::Result;

/// Settings storage trait
///
/// Values are namespaced by the caller through dotted keys
/// (e.g. `playback.volume`). Missing keys return `Ok(None)`; a value stored
/// under a different type than the one requested is an
/// [`OperationFailed`](crate::error::BridgeError::OperationFailed) error.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_preference(store: &dyn SettingsStore) -> Result<()> {
///     store.set_f64("playback.volume", 0.7).await?;
///     store.set_bool("playback.loop", true).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Store a floating-point value
    async fn set_f64(&self, key: &str, value: f64) -> Result<()>;

    /// Retrieve a floating-point value
    async fn get_f64(&self, key: &str) -> Result<Option<f64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}

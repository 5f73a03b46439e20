//! Session persistence on top of the host [`SettingsStore`].
//!
//! Everything here is best effort: callers log failures and carry on.

use std::sync::Arc;

use bridge_traits::SettingsStore;
use tracing::debug;

use crate::error::{PlaybackError, Result};
use crate::history::HistoryEntry;
use crate::track::Track;

pub const VOLUME_KEY: &str = "playback.volume";
pub const LOOP_KEY: &str = "playback.loop";
pub const LAST_TRACK_KEY: &str = "playback.last_track";
pub const LAST_POSITION_KEY: &str = "playback.last_position";
pub const HISTORY_KEY: &str = "playback.history";

/// Preferences restored at startup. `None` means never saved.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StoredPreferences {
    pub volume: Option<f32>,
    pub loop_enabled: Option<bool>,
}

/// Track and position saved when the previous session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct LastSession {
    pub track: Track,
    pub position_secs: f64,
}

/// Typed access to the playback keys of a settings store.
///
/// A store built with [`SessionStore::disabled`] accepts every call and
/// persists nothing.
#[derive(Clone)]
pub struct SessionStore {
    store: Option<Arc<dyn SettingsStore>>,
}

impl SessionStore {
    pub fn new(store: Option<Arc<dyn SettingsStore>>) -> Self {
        Self { store }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn save_volume(&self, volume: f32) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store
            .set_f64(VOLUME_KEY, f64::from(volume))
            .await
            .map_err(persistence_error)
    }

    pub async fn save_loop(&self, enabled: bool) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store
            .set_bool(LOOP_KEY, enabled)
            .await
            .map_err(persistence_error)
    }

    pub async fn load_preferences(&self) -> Result<StoredPreferences> {
        let Some(store) = &self.store else {
            return Ok(StoredPreferences::default());
        };

        let volume = store
            .get_f64(VOLUME_KEY)
            .await
            .map_err(persistence_error)?
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0) as f32);
        let loop_enabled = store.get_bool(LOOP_KEY).await.map_err(persistence_error)?;

        Ok(StoredPreferences {
            volume,
            loop_enabled,
        })
    }

    /// Save the track and position to resume from. `None` clears them.
    pub async fn save_last_session(&self, session: Option<&LastSession>) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        match session {
            Some(session) => {
                let json = serde_json::to_string(&session.track)
                    .map_err(|e| PlaybackError::Persistence(e.to_string()))?;
                store
                    .set_string(LAST_TRACK_KEY, &json)
                    .await
                    .map_err(persistence_error)?;
                store
                    .set_f64(LAST_POSITION_KEY, session.position_secs)
                    .await
                    .map_err(persistence_error)?;
                debug!(track_id = %session.track.id, position = session.position_secs, "Saved last session");
            }
            None => {
                store.delete(LAST_TRACK_KEY).await.map_err(persistence_error)?;
                store
                    .delete(LAST_POSITION_KEY)
                    .await
                    .map_err(persistence_error)?;
            }
        }

        Ok(())
    }

    pub async fn load_last_session(&self) -> Result<Option<LastSession>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let Some(json) = store
            .get_string(LAST_TRACK_KEY)
            .await
            .map_err(persistence_error)?
        else {
            return Ok(None);
        };

        let track: Track = serde_json::from_str(&json)
            .map_err(|e| PlaybackError::Persistence(format!("Corrupted last track: {}", e)))?;
        let position_secs = store
            .get_f64(LAST_POSITION_KEY)
            .await
            .map_err(persistence_error)?
            .filter(|p| p.is_finite() && *p >= 0.0)
            .unwrap_or(0.0);

        Ok(Some(LastSession {
            track,
            position_secs,
        }))
    }

    pub async fn save_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let json =
            serde_json::to_string(entries).map_err(|e| PlaybackError::Persistence(e.to_string()))?;
        store
            .set_string(HISTORY_KEY, &json)
            .await
            .map_err(persistence_error)
    }

    pub async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let Some(store) = &self.store else {
            return Ok(Vec::new());
        };

        match store.get_string(HISTORY_KEY).await.map_err(persistence_error)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| PlaybackError::Persistence(format!("Corrupted history: {}", e))),
            None => Ok(Vec::new()),
        }
    }
}

fn persistence_error(err: bridge_traits::BridgeError) -> PlaybackError {
    PlaybackError::Persistence(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::BridgeError;
    use chrono::Utc;
    use mockall::mock;

    mock! {
        Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()>;
            async fn get_string(&self, key: &str) -> BridgeResult<Option<String>>;
            async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()>;
            async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>>;
            async fn set_f64(&self, key: &str, value: f64) -> BridgeResult<()>;
            async fn get_f64(&self, key: &str) -> BridgeResult<Option<f64>>;
            async fn delete(&self, key: &str) -> BridgeResult<()>;
            async fn has_key(&self, key: &str) -> BridgeResult<bool>;
            async fn list_keys(&self) -> BridgeResult<Vec<String>>;
            async fn clear_all(&self) -> BridgeResult<()>;
        }
    }

    #[tokio::test]
    async fn disabled_store_is_a_no_op() {
        let store = SessionStore::disabled();
        assert!(!store.is_enabled());
        store.save_volume(0.5).await.unwrap();
        assert_eq!(store.load_preferences().await.unwrap(), StoredPreferences::default());
        assert!(store.load_last_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn volume_is_written_under_its_key() {
        let mut settings = MockSettings::new();
        settings
            .expect_set_f64()
            .withf(|key, value| key == VOLUME_KEY && (*value - 0.25).abs() < f64::EPSILON)
            .times(1)
            .returning(|_, _| Ok(()));

        let store = SessionStore::new(Some(Arc::new(settings)));
        store.save_volume(0.25).await.unwrap();
    }

    #[tokio::test]
    async fn stored_volume_is_clamped() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_f64()
            .withf(|key| key == VOLUME_KEY)
            .returning(|_| Ok(Some(3.0)));
        settings.expect_get_bool().returning(|_| Ok(Some(true)));

        let store = SessionStore::new(Some(Arc::new(settings)));
        let prefs = store.load_preferences().await.unwrap();
        assert_eq!(prefs.volume, Some(1.0));
        assert_eq!(prefs.loop_enabled, Some(true));
    }

    #[tokio::test]
    async fn store_failures_become_persistence_errors() {
        let mut settings = MockSettings::new();
        settings
            .expect_set_bool()
            .returning(|_, _| Err(BridgeError::OperationFailed("quota exceeded".into())));

        let store = SessionStore::new(Some(Arc::new(settings)));
        assert!(matches!(
            store.save_loop(true).await,
            Err(PlaybackError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn corrupted_history_is_reported() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .withf(|key| key == HISTORY_KEY)
            .returning(|_| Ok(Some("not json".to_string())));

        let store = SessionStore::new(Some(Arc::new(settings)));
        assert!(store.load_history().await.is_err());
    }

    #[tokio::test]
    async fn history_round_trips_through_json() {
        let saved = std::sync::Arc::new(parking_lot::Mutex::new(None::<String>));
        let mut settings = MockSettings::new();
        let sink = saved.clone();
        settings
            .expect_set_string()
            .returning(move |_, value| {
                *sink.lock() = Some(value.to_string());
                Ok(())
            });
        let source = saved.clone();
        settings
            .expect_get_string()
            .returning(move |_| Ok(source.lock().clone()));

        let store = SessionStore::new(Some(Arc::new(settings)));
        let entries = vec![HistoryEntry {
            track: Track::new("7", "Round Midnight", "Monk"),
            played_at: Utc::now(),
        }];
        store.save_history(&entries).await.unwrap();

        assert_eq!(store.load_history().await.unwrap(), entries);
    }
}

//! # Core Configuration
//!
//! Collects the host-provided bridge implementations the playback core needs
//! and validates them before anything starts.
//!
//! ## Required capabilities
//!
//! - [`EntitlementChecker`] - purchase checks for priced tracks
//! - [`MediaSource`] - track id to streamable URI
//! - [`AudioOutput`] - platform audio elements
//!
//! ## Optional capabilities
//!
//! - [`Notifier`] - defaults to `bridge_desktop::TracingNotifier` when the
//!   `desktop-shims` feature is enabled, required otherwise
//! - [`SettingsStore`] - enables session persistence
//! - [`Clock`] - defaults to [`SystemClock`]
//!
//! ## Example
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .entitlement_checker(Arc::new(OrderApi::new(client.clone())))
//!     .media_source(Arc::new(SongApi::new(client)))
//!     .audio_output(Arc::new(HtmlAudioOutput::new()))
//!     .settings_store(Arc::new(LocalStorageSettings::new()))
//!     .enable_persist_session(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AudioOutput, Clock, EntitlementChecker, MediaSource, Notifier, SettingsStore, SystemClock,
};
use std::sync::Arc;

/// Validated set of host capabilities.
#[derive(Clone)]
pub struct CoreConfig {
    pub entitlement_checker: Arc<dyn EntitlementChecker>,
    pub media_source: Arc<dyn MediaSource>,
    pub audio_output: Arc<dyn AudioOutput>,
    pub notifier: Arc<dyn Notifier>,
    /// Key-value store backing session persistence, if any.
    pub settings_store: Option<Arc<dyn SettingsStore>>,
    pub clock: Arc<dyn Clock>,
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("entitlement_checker", &"EntitlementChecker { ... }")
            .field("media_source", &"MediaSource { ... }")
            .field("audio_output", &"AudioOutput { ... }")
            .field("notifier", &"Notifier { ... }")
            .field(
                "settings_store",
                &self
                    .settings_store
                    .as_ref()
                    .map(|_| "SettingsStore { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

/// Optional behaviours that can be switched off by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Persist volume, loop flag, last track and history.
    pub persist_session: bool,
    /// Allow the full-screen video overlay.
    pub video_overlay: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            persist_session: false,
            video_overlay: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Check feature flags against the supplied capabilities.
    pub fn validate(&self) -> Result<()> {
        if self.features.persist_session && self.settings_store.is_none() {
            return Err(Error::Config(
                "Session persistence enabled but no SettingsStore provided. \
                 Disable the feature or inject a SettingsStore implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Settings store to persist into, when persistence is enabled.
    pub fn persistence_store(&self) -> Option<Arc<dyn SettingsStore>> {
        if self.features.persist_session {
            self.settings_store.clone()
        } else {
            None
        }
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_notifier() -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = Arc::new(bridge_desktop::TracingNotifier::new());
    Ok(notifier)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_notifier() -> Result<Arc<dyn Notifier>> {
    Err(capability_missing(
        "Notifier",
        "Notifier implementation is required to surface playback messages. \
         Desktop: enable the 'desktop-shims' feature to use the default TracingNotifier. \
         Web: inject a toast-based notifier.",
    ))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    entitlement_checker: Option<Arc<dyn EntitlementChecker>>,
    media_source: Option<Arc<dyn MediaSource>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    notifier: Option<Arc<dyn Notifier>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn entitlement_checker(mut self, checker: Arc<dyn EntitlementChecker>) -> Self {
        self.entitlement_checker = Some(checker);
        self
    }

    pub fn media_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.media_source = Some(source);
        self
    }

    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn enable_persist_session(mut self, enabled: bool) -> Self {
        self.features.persist_session = enabled;
        self
    }

    pub fn enable_video_overlay(mut self, enabled: bool) -> Self {
        self.features.video_overlay = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// [`Error::CapabilityMissing`] when a required bridge was not supplied,
    /// [`Error::Config`] when feature flags contradict the capabilities.
    pub fn build(self) -> Result<CoreConfig> {
        let entitlement_checker = self.entitlement_checker.ok_or_else(|| {
            capability_missing(
                "EntitlementChecker",
                "EntitlementChecker is required to gate priced tracks. \
                 Use .entitlement_checker() to inject the order service client.",
            )
        })?;

        let media_source = self.media_source.ok_or_else(|| {
            capability_missing(
                "MediaSource",
                "MediaSource is required to resolve track URIs. \
                 Use .media_source() to inject the song service client.",
            )
        })?;

        let audio_output = self.audio_output.ok_or_else(|| {
            capability_missing(
                "AudioOutput",
                "AudioOutput is required to play audio. \
                 Use .audio_output() to inject the platform media element factory.",
            )
        })?;

        let notifier = match self.notifier {
            Some(notifier) => notifier,
            None => provide_default_notifier()?,
        };

        let config = CoreConfig {
            entitlement_checker,
            media_source,
            audio_output,
            notifier,
            settings_store: self.settings_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{MediaElement, NoticeKind};

    struct FreeCatalog;

    #[async_trait]
    impl EntitlementChecker for FreeCatalog {
        async fn is_entitled(&self, _track_id: &str) -> BridgeResult<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl MediaSource for FreeCatalog {
        async fn resolve_uri(&self, track_id: &str) -> BridgeResult<String> {
            Ok(format!("https://cdn.example.com/{}.mp3", track_id))
        }
    }

    struct NoOutput;

    #[async_trait]
    impl AudioOutput for NoOutput {
        async fn open(&self, _uri: &str) -> BridgeResult<Arc<dyn MediaElement>> {
            Err(bridge_traits::BridgeError::NotAvailable("audio".to_string()))
        }
    }

    struct SilentNotifier;

    impl Notifier for SilentNotifier {
        fn notify(&self, _kind: NoticeKind, _message: &str) {}
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .entitlement_checker(Arc::new(FreeCatalog))
            .media_source(Arc::new(FreeCatalog))
            .audio_output(Arc::new(NoOutput))
            .notifier(Arc::new(SilentNotifier))
    }

    #[test]
    fn test_build_with_required_capabilities() {
        let config = complete_builder().build().unwrap();
        assert!(config.settings_store.is_none());
        assert_eq!(config.features, FeatureFlags::default());
        assert!(config.persistence_store().is_none());
    }

    #[test]
    fn test_missing_entitlement_checker() {
        let result = CoreConfig::builder()
            .media_source(Arc::new(FreeCatalog))
            .audio_output(Arc::new(NoOutput))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "EntitlementChecker")
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_audio_output() {
        let result = CoreConfig::builder()
            .entitlement_checker(Arc::new(FreeCatalog))
            .media_source(Arc::new(FreeCatalog))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "AudioOutput"
        ));
    }

    #[test]
    fn test_persist_session_requires_settings_store() {
        let result = complete_builder().enable_persist_session(true).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults() {
        let config = CoreConfig::builder()
            .entitlement_checker(Arc::new(FreeCatalog))
            .media_source(Arc::new(FreeCatalog))
            .audio_output(Arc::new(NoOutput))
            .settings_store(Arc::new(bridge_desktop::MemorySettingsStore::new()))
            .enable_persist_session(true)
            .build()
            .expect("desktop defaults should succeed");

        assert!(config.persistence_store().is_some());
        config.notifier.notify(NoticeKind::Info, "ready");
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_notifier_required_without_shims() {
        let result = CoreConfig::builder()
            .entitlement_checker(Arc::new(FreeCatalog))
            .media_source(Arc::new(FreeCatalog))
            .audio_output(Arc::new(NoOutput))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "Notifier"
        ));
    }
}

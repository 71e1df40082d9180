// Guild settings service - validation in front of the settings store.

use super::settings_models::{GuildSettings, Language};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Source of per-guild configuration.
///
/// Guilds that were never configured get [`GuildSettings::defaults`].
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn guild_settings(&self, guild_id: u64) -> Result<GuildSettings, SettingsError>;

    async fn save_settings(&self, settings: &GuildSettings) -> Result<(), SettingsError>;
}

pub struct SettingsService {
    provider: Arc<dyn SettingsProvider>,
}

impl SettingsService {
    pub fn new(provider: Arc<dyn SettingsProvider>) -> Self {
        Self { provider }
    }

    pub async fn get(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        self.provider.guild_settings(guild_id).await
    }

    async fn update(
        &self,
        guild_id: u64,
        apply: impl FnOnce(&mut GuildSettings),
    ) -> Result<GuildSettings, SettingsError> {
        let mut settings = self.provider.guild_settings(guild_id).await?;
        apply(&mut settings);
        self.provider.save_settings(&settings).await?;
        Ok(settings)
    }

    pub async fn set_mention_threshold(
        &self,
        guild_id: u64,
        threshold: u32,
    ) -> Result<GuildSettings, SettingsError> {
        if threshold == 0 {
            return Err(SettingsError::Invalid(
                "mention threshold must be at least 1".to_string(),
            ));
        }
        self.update(guild_id, |s| s.mention_threshold = threshold)
            .await
    }

    pub async fn set_mention_window(
        &self,
        guild_id: u64,
        seconds: u64,
    ) -> Result<GuildSettings, SettingsError> {
        if seconds == 0 {
            return Err(SettingsError::Invalid(
                "mention window must be at least 1 second".to_string(),
            ));
        }
        self.update(guild_id, |s| s.mention_window_secs = seconds)
            .await
    }

    pub async fn set_language(
        &self,
        guild_id: u64,
        language: Language,
    ) -> Result<GuildSettings, SettingsError> {
        self.update(guild_id, |s| s.language = language).await
    }

    /// Set or clear (with `None`) the starboard output channel.
    pub async fn set_starboard_channel(
        &self,
        guild_id: u64,
        channel_id: Option<u64>,
    ) -> Result<GuildSettings, SettingsError> {
        self.update(guild_id, |s| s.starboard_channel_id = channel_id)
            .await
    }

    pub async fn set_starboard_minimum(
        &self,
        guild_id: u64,
        minimum: u32,
    ) -> Result<GuildSettings, SettingsError> {
        if minimum == 0 {
            return Err(SettingsError::Invalid(
                "starboard minimum must be at least 1".to_string(),
            ));
        }
        self.update(guild_id, |s| s.starboard_minimum = minimum)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::InMemorySettings;

    fn service() -> (Arc<InMemorySettings>, SettingsService) {
        let provider = Arc::new(InMemorySettings::new());
        let service = SettingsService::new(provider.clone());
        (provider, service)
    }

    #[tokio::test]
    async fn test_unconfigured_guild_gets_defaults() {
        let (_, service) = service();
        let settings = service.get(42).await.unwrap();
        assert_eq!(settings, GuildSettings::defaults(42));
    }

    #[tokio::test]
    async fn test_updates_are_persisted() {
        let (provider, service) = service();
        service.set_mention_threshold(42, 5).await.unwrap();
        service.set_starboard_channel(42, Some(555)).await.unwrap();
        service.set_language(42, Language::EsEs).await.unwrap();

        let stored = provider.guild_settings(42).await.unwrap();
        assert_eq!(stored.mention_threshold, 5);
        assert_eq!(stored.starboard_channel_id, Some(555));
        assert_eq!(stored.language, Language::EsEs);
    }

    #[tokio::test]
    async fn test_zero_values_are_rejected() {
        let (provider, service) = service();

        assert!(matches!(
            service.set_mention_threshold(42, 0).await,
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            service.set_mention_window(42, 0).await,
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            service.set_starboard_minimum(42, 0).await,
            Err(SettingsError::Invalid(_))
        ));

        // Nothing was written for the rejected updates.
        assert_eq!(provider.saves(), 0);
    }

    #[tokio::test]
    async fn test_clearing_starboard_channel() {
        let (_, service) = service();
        service.set_starboard_channel(42, Some(555)).await.unwrap();
        let settings = service.set_starboard_channel(42, None).await.unwrap();
        assert_eq!(settings.starboard_channel_id, None);
    }
}

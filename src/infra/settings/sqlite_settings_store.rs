// SQLite-backed guild settings.
//
// Tables:
// - guild_settings: One row per configured guild

use crate::core::settings::{GuildSettings, Language, SettingsError, SettingsProvider};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                mention_threshold INTEGER NOT NULL,
                mention_window_secs INTEGER NOT NULL,
                language TEXT NOT NULL,
                starboard_channel_id INTEGER,
                starboard_minimum INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SettingsProvider for SqliteSettingsStore {
    async fn guild_settings(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        let row = sqlx::query(
            r#"
            SELECT mention_threshold, mention_window_secs, language,
                   starboard_channel_id, starboard_minimum
            FROM guild_settings
            WHERE guild_id = ?
            "#,
        )
        .bind(guild_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(GuildSettings::defaults(guild_id));
        };

        let code: String = row.get("language");
        // Unknown codes fall back rather than making the guild unreadable.
        let language = Language::from_code(&code).unwrap_or_default();

        Ok(GuildSettings {
            guild_id,
            mention_threshold: row.get::<i64, _>("mention_threshold") as u32,
            mention_window_secs: row.get::<i64, _>("mention_window_secs") as u64,
            language,
            starboard_channel_id: row
                .get::<Option<i64>, _>("starboard_channel_id")
                .map(|id| id as u64),
            starboard_minimum: row.get::<i64, _>("starboard_minimum") as u32,
        })
    }

    async fn save_settings(&self, settings: &GuildSettings) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            INSERT INTO guild_settings
                (guild_id, mention_threshold, mention_window_secs, language,
                 starboard_channel_id, starboard_minimum)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                mention_threshold = excluded.mention_threshold,
                mention_window_secs = excluded.mention_window_secs,
                language = excluded.language,
                starboard_channel_id = excluded.starboard_channel_id,
                starboard_minimum = excluded.starboard_minimum
            "#,
        )
        .bind(settings.guild_id as i64)
        .bind(settings.mention_threshold as i64)
        .bind(settings.mention_window_secs as i64)
        .bind(settings.language.code())
        .bind(settings.starboard_channel_id.map(|id| id as i64))
        .bind(settings.starboard_minimum as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::open_pool;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteSettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        let pool = open_pool(path.to_str().unwrap()).await.unwrap();
        let store = SqliteSettingsStore::new(pool);
        store.migrate().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_unconfigured_guild_gets_defaults() {
        let (_dir, store) = store().await;
        let settings = store.guild_settings(42).await.unwrap();
        assert_eq!(settings, GuildSettings::defaults(42));
    }

    #[tokio::test]
    async fn test_saved_settings_are_read_back() {
        let (_dir, store) = store().await;
        let settings = GuildSettings {
            mention_threshold: 3,
            mention_window_secs: 12,
            language: Language::EsEs,
            starboard_channel_id: Some(77),
            starboard_minimum: 2,
            ..GuildSettings::defaults(42)
        };
        store.save_settings(&settings).await.unwrap();

        assert_eq!(store.guild_settings(42).await.unwrap(), settings);

        let cleared = GuildSettings {
            starboard_channel_id: None,
            ..settings
        };
        store.save_settings(&cleared).await.unwrap();
        assert_eq!(store.guild_settings(42).await.unwrap().starboard_channel_id, None);
    }

    #[tokio::test]
    async fn test_unknown_language_code_falls_back() {
        let (_dir, store) = store().await;
        sqlx::query(
            "INSERT INTO guild_settings VALUES (42, 4, 5, 'xx-XX', NULL, 1)",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let settings = store.guild_settings(42).await.unwrap();
        assert_eq!(settings.language, Language::EnUs);
        assert_eq!(settings.mention_threshold, 4);
    }
}

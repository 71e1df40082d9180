// SQLite-backed starboard records.
//
// Tables:
// - starboard: One row per starred message and its mirror in the starboard channel

use crate::core::coordination::StoreError;
use crate::core::starboard::{DeleteOutcome, StarboardEntry, StarboardStore};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteStarboardStore {
    pool: Pool<Sqlite>,
}

impl SqliteStarboardStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS starboard (
                guild_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                star_message_id INTEGER,
                star_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, channel_id, message_id)
            );
            CREATE INDEX IF NOT EXISTS idx_starboard_guild_message
                ON starboard(guild_id, message_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(())
    }
}

fn entry_from_row(row: &SqliteRow) -> StarboardEntry {
    StarboardEntry {
        guild_id: row.get::<i64, _>("guild_id") as u64,
        channel_id: row.get::<i64, _>("channel_id") as u64,
        message_id: row.get::<i64, _>("message_id") as u64,
        star_message_id: row
            .get::<Option<i64>, _>("star_message_id")
            .map(|id| id as u64),
        star_count: row.get::<i64, _>("star_count") as u32,
    }
}

#[async_trait]
impl StarboardStore for SqliteStarboardStore {
    async fn delete_by_message(
        &self,
        guild_id: u64,
        message_id: u64,
    ) -> Result<DeleteOutcome, StoreError> {
        let rows = sqlx::query(
            r#"
            DELETE FROM starboard
            WHERE guild_id = ? AND message_id = ?
            RETURNING guild_id, channel_id, message_id, star_message_id, star_count
            "#,
        )
        .bind(guild_id as i64)
        .bind(message_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        let deleted: Vec<StarboardEntry> = rows.iter().map(entry_from_row).collect();
        Ok(DeleteOutcome {
            affected: deleted.len() as u64,
            deleted,
        })
    }

    async fn get_entry(
        &self,
        guild_id: u64,
        message_id: u64,
    ) -> Result<Option<StarboardEntry>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT guild_id, channel_id, message_id, star_message_id, star_count
            FROM starboard
            WHERE guild_id = ? AND message_id = ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(message_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(row.as_ref().map(entry_from_row))
    }

    async fn upsert_entry(&self, entry: &StarboardEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO starboard (guild_id, channel_id, message_id, star_message_id, star_count)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(guild_id, channel_id, message_id) DO UPDATE SET
                star_message_id = COALESCE(excluded.star_message_id, starboard.star_message_id),
                star_count = excluded.star_count
            "#,
        )
        .bind(entry.guild_id as i64)
        .bind(entry.channel_id as i64)
        .bind(entry.message_id as i64)
        .bind(entry.star_message_id.map(|id| id as i64))
        .bind(entry.star_count as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::open_pool;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteStarboardStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starboard.db");
        let pool = open_pool(path.to_str().unwrap()).await.unwrap();
        let store = SqliteStarboardStore::new(pool);
        store.migrate().await.unwrap();
        (dir, store)
    }

    fn starred() -> StarboardEntry {
        StarboardEntry {
            guild_id: 1,
            channel_id: 11,
            message_id: 111,
            star_message_id: Some(123),
            star_count: 3,
        }
    }

    #[tokio::test]
    async fn test_delete_returns_removed_row_once() {
        let (_dir, store) = store().await;
        store.upsert_entry(&starred()).await.unwrap();

        let first = store.delete_by_message(1, 111).await.unwrap();
        assert_eq!(first.affected, 1);
        assert_eq!(first.deleted, vec![starred()]);

        let second = store.delete_by_message(1, 111).await.unwrap();
        assert_eq!(second, DeleteOutcome::default());
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_guild() {
        let (_dir, store) = store().await;
        store.upsert_entry(&starred()).await.unwrap();

        let outcome = store.delete_by_message(2, 111).await.unwrap();
        assert_eq!(outcome.affected, 0);
        assert!(store.get_entry(1, 111).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upsert_keeps_known_mirror() {
        let (_dir, store) = store().await;
        store.upsert_entry(&starred()).await.unwrap();

        store
            .upsert_entry(&StarboardEntry {
                star_message_id: None,
                star_count: 4,
                ..starred()
            })
            .await
            .unwrap();

        let entry = store.get_entry(1, 111).await.unwrap().unwrap();
        assert_eq!(entry.star_count, 4);
        assert_eq!(entry.star_message_id, Some(123));
    }
}

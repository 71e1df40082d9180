// SQLite-backed moderation case log.
//
// Tables:
// - moderation_cases: One row per moderation action, case ids per guild

use crate::core::coordination::StoreError;
use crate::core::moderation::{CaseStore, NewCase};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteCaseStore {
    pool: Pool<Sqlite>,
}

impl SqliteCaseStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_cases (
                guild_id INTEGER NOT NULL,
                case_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                moderator_id INTEGER NOT NULL,
                type_code INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, case_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CaseStore for SqliteCaseStore {
    async fn create_case(&self, case: NewCase) -> Result<u64, StoreError> {
        // Id assignment and insert are one statement, so concurrent writers
        // in the same guild can't be handed the same case id.
        let row = sqlx::query(
            r#"
            INSERT INTO moderation_cases
                (guild_id, case_id, user_id, moderator_id, type_code, reason, created_at)
            SELECT ?, COALESCE(MAX(case_id), 0) + 1, ?, ?, ?, ?, ?
            FROM moderation_cases
            WHERE guild_id = ?
            RETURNING case_id
            "#,
        )
        .bind(case.guild_id as i64)
        .bind(case.user_id as i64)
        .bind(case.moderator_id as i64)
        .bind(case.case_type.code())
        .bind(&case.reason)
        .bind(case.created_at.to_rfc3339())
        .bind(case.guild_id as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        let case_id: i64 = row.get("case_id");
        Ok(case_id as u64)
    }
}

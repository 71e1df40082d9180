// Shared SQLite pool setup for the infra stores.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Open (creating if needed) the SQLite database at `path`.
pub async fn open_pool(path: &str) -> anyhow::Result<Pool<Sqlite>> {
    let path_str = path.trim_start_matches("sqlite://");
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", path_str))
        .await?;
    Ok(pool)
}

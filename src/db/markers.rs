use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::Database;

/// Keys of the client-local session markers. Cleared on logout and on each
/// fresh visit to the entry surface.
pub const MARKER_USER_ID: &str = "user_id";
pub const MARKER_USER_NAME: &str = "user_name";
pub const MARKER_LAST_RECOGNITION: &str = "last_recognition";

impl Database {
    pub async fn set_marker(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO markers (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| "failed to set marker")?;
            Ok(())
        })
        .await
    }

    pub async fn get_marker(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM markers WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| "failed to read marker")
        })
        .await
    }

    pub async fn clear_markers(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM markers", [])
                .with_context(|| "failed to clear markers")?;
            Ok(())
        })
        .await
    }
}

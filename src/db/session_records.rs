use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{parse_datetime, Database};
use crate::models::SessionRecord;

impl Database {
    pub async fn insert_session_record(&self, record: &SessionRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO session_records (id, user_id, user_name, recognized_at, ended_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.user_id,
                    record.user_name,
                    record.recognized_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session record")?;
            Ok(())
        })
        .await
    }

    pub async fn latest_session_record(&self) -> Result<Option<SessionRecord>> {
        self.execute(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, user_name, recognized_at, ended_at
                     FROM session_records
                     ORDER BY recognized_at DESC
                     LIMIT 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, String>("id")?,
                            row.get::<_, String>("user_id")?,
                            row.get::<_, String>("user_name")?,
                            row.get::<_, String>("recognized_at")?,
                            row.get::<_, Option<String>>("ended_at")?,
                        ))
                    },
                )
                .optional()
                .with_context(|| "failed to load latest session record")?;

            row.map(|(id, user_id, user_name, recognized_at, ended_at)| {
                Ok(SessionRecord {
                    id,
                    user_id,
                    user_name,
                    recognized_at: parse_datetime(&recognized_at)?,
                    ended_at: ended_at.as_deref().map(parse_datetime).transpose()?,
                })
            })
            .transpose()
        })
        .await
    }

    pub async fn mark_session_ended(
        &self,
        session_id: &str,
        ended_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE session_records SET ended_at = ?1 WHERE id = ?2",
                params![ended_at.to_rfc3339(), session_id],
            )
            .with_context(|| "failed to mark session ended")?;
            Ok(())
        })
        .await
    }
}

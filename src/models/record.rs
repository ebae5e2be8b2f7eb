use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local record of a recognized login, created only after a positive match.
///
/// Persisted to the local store and mirrored (best-effort) to the server
/// session endpoint; cleared on logout or a fresh visit to the entry surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub recognized_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(user_id: String, user_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            user_name,
            recognized_at: Utc::now(),
            ended_at: None,
        }
    }
}

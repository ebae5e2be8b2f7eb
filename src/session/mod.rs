mod bootstrap;

pub use bootstrap::{redirect_unregistered, run_session_bootstrap, BootstrapResult};

use anyhow::Result;
use chrono::Utc;

use crate::api::RecognitionApi;
use crate::db::Database;
use crate::navigation::{Navigator, Route};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Explicit logout: best-effort server session end, marker purge, and
/// navigation back to the entry surface.
///
/// Server failures never block the local teardown.
pub async fn end_session(
    db: &Database,
    api: &dyn RecognitionApi,
    navigator: &dyn Navigator,
) -> Result<()> {
    if let Some(record) = db.latest_session_record().await? {
        if record.ended_at.is_none() {
            if let Err(err) = api.end_session(&record.id).await {
                log_warn!("server session end failed for {}: {err}", record.id);
            }
            db.mark_session_ended(&record.id, Utc::now()).await?;
        }
    }

    db.clear_markers().await?;
    log_info!("session ended, returning to entry surface");
    navigator.navigate(Route::Entry);
    Ok(())
}

use tokio::time::sleep;

use crate::db::{MARKER_LAST_RECOGNITION, MARKER_USER_ID, MARKER_USER_NAME};
use crate::models::SessionRecord;
use crate::navigation::Route;
use crate::recognition::{LoopContext, PROFILE_ERROR_MESSAGE};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// How a bootstrap run ended, from the recognition loop's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapResult {
    /// Navigation fired; the loop is done.
    Navigated,
    /// Profile resolution failed; AttemptState was reset and recognition
    /// should continue.
    Retry,
    /// The surface was torn down mid-bootstrap; nothing further may run.
    Cancelled,
}

/// Session bootstrap after a positive match: resolve the durable user id,
/// persist the session markers, open the server-side session (best-effort),
/// and navigate after the display delay. Every step checks the guard first.
pub async fn run_session_bootstrap(ctx: &mut LoopContext, user_name: &str) -> BootstrapResult {
    // 1. Durable user id. A failure here is recoverable: show the message,
    //    wait out the cooldown, then let recognition retry from scratch.
    let lookup = tokio::select! {
        _ = ctx.guard.cancelled() => return BootstrapResult::Cancelled,
        result = ctx.api.user_id_by_name(user_name) => result,
    };

    let user_id = match lookup {
        Ok(user_id) => user_id,
        Err(err) => {
            log_error!("user id lookup failed for {user_name}: {err}");
            ctx.state.message = Some(PROFILE_ERROR_MESSAGE.to_string());
            ctx.publish();

            tokio::select! {
                _ = ctx.guard.cancelled() => return BootstrapResult::Cancelled,
                _ = sleep(ctx.config.retry_cooldown) => {}
            }
            if !ctx.guard.is_active() {
                return BootstrapResult::Cancelled;
            }

            ctx.state.reset();
            ctx.publish();
            return BootstrapResult::Retry;
        }
    };

    if !ctx.guard.is_active() {
        return BootstrapResult::Cancelled;
    }

    // 2. Persist the session record and markers locally. Downstream surfaces
    //    read these; a store failure is logged but does not abort the login.
    let record = SessionRecord::new(user_id, user_name.to_string());
    if let Err(err) = persist_record(ctx, &record).await {
        log_error!("failed to persist session record: {err}");
    }

    if !ctx.guard.is_active() {
        return BootstrapResult::Cancelled;
    }

    // 3. Server-side session start is best-effort only.
    if let Err(err) = ctx.api.start_session(&record.user_id, &record.user_name).await {
        log_warn!("server session start failed: {err}");
    }

    if !ctx.guard.is_active() {
        return BootstrapResult::Cancelled;
    }

    // 4. Navigate after the display delay, only if still mounted.
    tokio::select! {
        _ = ctx.guard.cancelled() => return BootstrapResult::Cancelled,
        _ = sleep(ctx.config.transition_delay) => {}
    }
    if !ctx.guard.is_active() {
        return BootstrapResult::Cancelled;
    }

    log_info!("login complete for {user_name}, navigating home");
    ctx.navigator.navigate(Route::Home);
    BootstrapResult::Navigated
}

/// Detected-but-unregistered: no id resolution, just a delayed redirect to
/// the registration surface, gated on the guard.
pub async fn redirect_unregistered(ctx: &LoopContext) {
    tokio::select! {
        _ = ctx.guard.cancelled() => return,
        _ = sleep(ctx.config.transition_delay) => {}
    }
    if !ctx.guard.is_active() {
        return;
    }
    ctx.navigator.navigate(Route::Register);
}

async fn persist_record(ctx: &LoopContext, record: &SessionRecord) -> anyhow::Result<()> {
    ctx.db.insert_session_record(record).await?;
    ctx.db.set_marker(MARKER_USER_ID, &record.user_id).await?;
    ctx.db.set_marker(MARKER_USER_NAME, &record.user_name).await?;
    ctx.db
        .set_marker(MARKER_LAST_RECOGNITION, &record.recognized_at.to_rfc3339())
        .await?;
    Ok(())
}

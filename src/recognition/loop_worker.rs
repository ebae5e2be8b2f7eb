use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::api::RecognitionApi;
use crate::capture::CaptureFrame;
use crate::config::RecognitionConfig;
use crate::db::Database;
use crate::lifecycle::LifecycleGuard;
use crate::navigation::Navigator;
use crate::session::{redirect_unregistered, run_session_bootstrap, BootstrapResult};

use super::state::{classify, AttemptResult, AttemptState, Outcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Everything a recognition continuation may touch, threaded explicitly into
/// the loop and the session bootstrap instead of living in ambient state.
pub struct LoopContext {
    pub state: AttemptState,
    pub guard: LifecycleGuard,
    pub api: Arc<dyn RecognitionApi>,
    pub db: Database,
    pub navigator: Arc<dyn Navigator>,
    pub config: RecognitionConfig,
    snapshot_tx: watch::Sender<AttemptState>,
}

impl LoopContext {
    pub fn new(
        guard: LifecycleGuard,
        api: Arc<dyn RecognitionApi>,
        db: Database,
        navigator: Arc<dyn Navigator>,
        config: RecognitionConfig,
        snapshot_tx: watch::Sender<AttemptState>,
    ) -> Self {
        Self {
            state: AttemptState::new(config.max_attempts),
            guard,
            api,
            db,
            navigator,
            config,
            snapshot_tx,
        }
    }

    /// Publish the current state to UI subscribers.
    pub fn publish(&self) {
        let _ = self.snapshot_tx.send(self.state.clone());
    }
}

/// Drives recognition attempts from the frame subscription until a terminal
/// outcome, the subscription closes, or the surface is torn down.
///
/// Requests are strictly sequential: while one is in flight, arriving frames
/// are dropped, never queued. A request still pending at teardown is aborted
/// and its late resolution mutates nothing.
pub async fn recognition_loop(mut ctx: LoopContext, mut frames: mpsc::Receiver<CaptureFrame>) {
    let guard = ctx.guard.clone();
    let mut subscribed = true;

    'surface: loop {
        if !subscribed {
            log_info!("frame subscription closed, stopping recognition");
            break;
        }

        let frame = tokio::select! {
            _ = guard.cancelled() => {
                log_info!("recognition loop shutting down");
                break;
            }
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => {
                    subscribed = false;
                    continue;
                }
            },
        };

        // Busy never holds here; this gates terminal outcomes and the
        // attempt budget.
        if !ctx.state.accepts_frame() {
            continue;
        }

        ctx.state.begin_attempt();
        ctx.publish();

        let api = ctx.api.clone();
        let mut request = tokio::spawn(async move { api.recognize(&frame).await });

        // Await the in-flight request; frames arriving meanwhile are dropped.
        let joined = loop {
            tokio::select! {
                _ = guard.cancelled() => {
                    request.abort();
                    log_info!("recognition loop shutting down");
                    break 'surface;
                }
                joined = &mut request => break joined,
                extra = frames.recv(), if subscribed => {
                    match extra {
                        Some(_) => log_info!("attempt in flight, dropping frame"),
                        None => subscribed = false,
                    }
                }
            }
        };

        if !guard.is_active() {
            break;
        }

        let result = match joined {
            Ok(Ok(response)) => classify(&response),
            Ok(Err(err)) => {
                if !err.is_cancelled() {
                    log_warn!(
                        "recognition attempt {} failed: {err}",
                        ctx.state.attempts_made
                    );
                }
                AttemptResult::TransportError
            }
            Err(join_err) => {
                log_error!("recognition request task failed: {join_err}");
                AttemptResult::TransportError
            }
        };

        ctx.state.complete_attempt(result);
        ctx.publish();

        match ctx.state.outcome.clone() {
            Outcome::Matched { user_name } => {
                log_info!("matched user {user_name}");
                match run_session_bootstrap(&mut ctx, &user_name).await {
                    BootstrapResult::Navigated | BootstrapResult::Cancelled => break,
                    // AttemptState was reset; keep consuming frames.
                    BootstrapResult::Retry => {}
                }
            }
            Outcome::DetectedUnregistered => {
                log_info!("face detected but unregistered, redirecting");
                redirect_unregistered(&ctx).await;
                break;
            }
            Outcome::Exhausted => {
                log_warn!(
                    "attempt budget ({}) exhausted without a match",
                    ctx.state.max_attempts
                );
                break;
            }
            Outcome::Pending => {}
        }
    }
}

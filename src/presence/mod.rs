use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::RecognitionApi;
use crate::capture::CaptureFrame;
use crate::config::RecognitionConfig;
use crate::db::{Database, MARKER_USER_NAME};
use crate::navigation::Navigator;
use crate::session::end_session;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Watches that the logged-in user stays in front of the camera.
///
/// Polls the recognition endpoint at the face-polling cadence; going unseen
/// for longer than the absence timeout ends the session. A pause flag
/// suspends checks while the user is on surfaces that hide the camera.
pub struct PresenceMonitor {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    paused: Arc<AtomicBool>,
}

impl PresenceMonitor {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start monitoring for the user recorded in the session markers. Bails
    /// when no user is logged in.
    pub async fn start(
        &mut self,
        frames: mpsc::Receiver<CaptureFrame>,
        api: Arc<dyn RecognitionApi>,
        db: Database,
        navigator: Arc<dyn Navigator>,
        config: &RecognitionConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("presence monitor already active");
        }

        let user_name = db
            .get_marker(MARKER_USER_NAME)
            .await
            .context("failed to read session marker")?;
        let Some(user_name) = user_name else {
            bail!("no logged-in user to monitor");
        };

        log_info!("presence monitoring activated for {user_name}");

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(presence_loop(
            user_name,
            frames,
            api,
            db,
            navigator,
            cancel_token.clone(),
            self.paused.clone(),
            config.absence_timeout,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Suspend or resume presence checks without tearing the loop down.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("presence monitor task failed to join")?;
        }
        Ok(())
    }
}

impl Default for PresenceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::too_many_arguments)]
async fn presence_loop(
    user_name: String,
    mut frames: mpsc::Receiver<CaptureFrame>,
    api: Arc<dyn RecognitionApi>,
    db: Database,
    navigator: Arc<dyn Navigator>,
    cancel_token: CancellationToken,
    paused: Arc<AtomicBool>,
    absence_timeout: Duration,
) {
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_info!("presence monitor shutting down");
                break;
            }

            frame = frames.recv() => {
                let Some(frame) = frame else {
                    log_info!("frame subscription closed, presence monitor stopping");
                    break;
                };

                if paused.load(Ordering::SeqCst) {
                    // Paused also resets the absence window so resuming does
                    // not instantly log the user out.
                    last_seen = Instant::now();
                    continue;
                }

                match api.recognize(&frame).await {
                    Ok(response)
                        if response.found && response.user.as_deref() == Some(&user_name) =>
                    {
                        last_seen = Instant::now();
                    }
                    Ok(_) => {
                        let unseen = last_seen.elapsed();
                        if unseen >= absence_timeout {
                            log_info!(
                                "{user_name} unseen for {}s, ending session",
                                unseen.as_secs()
                            );
                            if cancel_token.is_cancelled() {
                                break;
                            }
                            if let Err(err) =
                                end_session(&db, api.as_ref(), navigator.as_ref()).await
                            {
                                log_warn!("presence-triggered logout failed: {err}");
                            }
                            break;
                        }
                        log_info!(
                            "{user_name} not detected ({}s until logout)",
                            (absence_timeout - unseen).as_secs()
                        );
                    }
                    Err(err) => {
                        // Per-check failures are absorbed; the next frame retries.
                        log_warn!("presence check failed: {err}");
                    }
                }
            }
        }
    }
}

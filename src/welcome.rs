use std::sync::Arc;

use tokio::sync::watch;

use crate::api::RecognitionApi;
use crate::capture::{Camera, CaptureSource};
use crate::config::RecognitionConfig;
use crate::db::Database;
use crate::error::FacegateError;
use crate::navigation::Navigator;
use crate::recognition::{AttemptState, RecognitionController};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Orchestrates the welcome/entry surface: marker reset, backend health
/// probe, camera activation, and the recognition loop.
///
/// `enter`/`leave` bracket one mount of the surface. Camera acquisition
/// failure is terminal — capture is not retried and the caller is expected to
/// offer the manual-registration path.
pub struct WelcomeFlow {
    db: Database,
    api: Arc<dyn RecognitionApi>,
    navigator: Arc<dyn Navigator>,
    config: RecognitionConfig,
    capture: CaptureSource,
    recognition: RecognitionController,
}

impl WelcomeFlow {
    pub fn new(
        camera: Arc<dyn Camera>,
        api: Arc<dyn RecognitionApi>,
        db: Database,
        navigator: Arc<dyn Navigator>,
        config: RecognitionConfig,
    ) -> Self {
        let capture = CaptureSource::new(camera, config.capture_interval);
        let recognition = RecognitionController::new(&config);
        Self {
            db,
            api,
            navigator,
            config,
            capture,
            recognition,
        }
    }

    /// Enter standby: clear stale session markers, verify the backend is
    /// reachable, then start capturing and recognizing.
    pub async fn enter(&mut self) -> Result<(), FacegateError> {
        if self.recognition.is_active() {
            log_warn!("entry surface already active, restarting");
            self.leave().await?;
        }

        // Fresh visit: any previous session markers are stale.
        self.db.clear_markers().await?;

        self.api.health().await?;

        let frames = self.capture.activate()?;
        self.recognition.start(
            frames,
            self.api.clone(),
            self.db.clone(),
            self.navigator.clone(),
            self.config.clone(),
        )?;

        log_info!("entry surface active, scanning for a face");
        Ok(())
    }

    /// Latest recognition state for the UI.
    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.recognition.subscribe()
    }

    /// Tear down the surface: stops recognition (aborting in-flight work)
    /// and releases the camera. Safe to call when not active.
    pub async fn leave(&mut self) -> Result<(), FacegateError> {
        self.recognition.stop().await?;
        self.capture.deactivate();
        Ok(())
    }
}

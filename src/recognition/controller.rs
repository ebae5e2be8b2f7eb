use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::RecognitionApi;
use crate::capture::CaptureFrame;
use crate::config::RecognitionConfig;
use crate::db::Database;
use crate::lifecycle::LifecycleGuard;
use crate::navigation::Navigator;

use super::loop_worker::{recognition_loop, LoopContext};
use super::state::AttemptState;

/// Owns one recognition loop instance per mount of the entry surface.
pub struct RecognitionController {
    handle: Option<JoinHandle<()>>,
    guard: Option<LifecycleGuard>,
    snapshot_tx: watch::Sender<AttemptState>,
}

impl RecognitionController {
    pub fn new(config: &RecognitionConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(AttemptState::new(config.max_attempts));
        Self {
            handle: None,
            guard: None,
            snapshot_tx,
        }
    }

    pub fn start(
        &mut self,
        frames: mpsc::Receiver<CaptureFrame>,
        api: Arc<dyn RecognitionApi>,
        db: Database,
        navigator: Arc<dyn Navigator>,
        config: RecognitionConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("recognition already active");
        }

        let guard = LifecycleGuard::new();
        let ctx = LoopContext::new(
            guard.clone(),
            api,
            db,
            navigator,
            config,
            self.snapshot_tx.clone(),
        );
        // Fresh mount: snapshot goes back to Pending/0.
        ctx.publish();

        self.handle = Some(tokio::spawn(recognition_loop(ctx, frames)));
        self.guard = Some(guard);
        Ok(())
    }

    /// Latest state snapshot stream for UI surfaces.
    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.snapshot_tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Tear down the loop: flips the guard, aborts in-flight work, and joins
    /// the worker.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(guard) = self.guard.take() {
            guard.teardown();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("recognition loop task failed to join")?;
        }
        Ok(())
    }
}

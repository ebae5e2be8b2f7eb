use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{Camera, CaptureFrame};
use crate::error::FacegateError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Owns the camera stream and, while active, offers a [`CaptureFrame`] to the
/// subscriber at a fixed cadence.
///
/// Frames the subscriber has not consumed by the next tick are dropped, never
/// queued. Camera acquisition failure is terminal: no ticker is spawned and
/// the error is reported to the caller.
pub struct CaptureSource {
    camera: Arc<dyn Camera>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl CaptureSource {
    pub fn new(camera: Arc<dyn Camera>, interval: Duration) -> Self {
        Self {
            camera,
            interval,
            handle: None,
            cancel_token: None,
        }
    }

    /// Acquire the camera and start producing frames. Returns the frame
    /// subscription; dropping the receiver is equivalent to unsubscribing.
    ///
    /// Re-activation releases the previous stream before acquiring a new one.
    pub fn activate(&mut self) -> Result<mpsc::Receiver<CaptureFrame>, FacegateError> {
        self.deactivate();

        self.camera.acquire()?;

        let (frame_tx, frame_rx) = mpsc::channel(1);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            self.camera.clone(),
            frame_tx,
            self.interval,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(frame_rx)
    }

    /// Stop the ticker and release the camera immediately. Idempotent.
    pub fn deactivate(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.camera.release();
            log_info!("capture source deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn capture_loop(
    camera: Arc<dyn Camera>,
    frames: mpsc::Sender<CaptureFrame>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let grabber = camera.clone();
                let grabbed = tokio::task::spawn_blocking(move || grabber.grab_frame()).await;

                let bytes = match grabbed {
                    Ok(Ok(bytes)) => bytes,
                    Ok(Err(err)) => {
                        log_warn!("frame grab failed, skipping cycle: {err}");
                        continue;
                    }
                    Err(join_err) => {
                        log_error!("frame grab worker join failed: {join_err}");
                        continue;
                    }
                };

                match frames.try_send(CaptureFrame::new(bytes)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        // Subscriber is mid-attempt; this frame is dropped.
                        log_info!("subscriber busy, dropping frame");
                    }
                    Err(TrySendError::Closed(_)) => {
                        log_info!("frame subscriber gone, stopping capture");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCamera {
        acquired: AtomicUsize,
        released: AtomicUsize,
        fail_acquire: bool,
    }

    impl CountingCamera {
        fn new(fail_acquire: bool) -> Self {
            Self {
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
                fail_acquire,
            }
        }
    }

    impl Camera for CountingCamera {
        fn acquire(&self) -> Result<(), FacegateError> {
            if self.fail_acquire {
                return Err(FacegateError::CameraUnavailable("permission denied".into()));
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn grab_frame(&self) -> Result<Vec<u8>, FacegateError> {
            Ok(vec![0xff, 0xd8, 0xff])
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn acquisition_failure_is_terminal_and_produces_no_frames() {
        let camera = Arc::new(CountingCamera::new(true));
        let mut source = CaptureSource::new(camera.clone(), Duration::from_millis(10));

        let err = source.activate().expect_err("activation should fail");
        assert!(matches!(err, FacegateError::CameraUnavailable(_)));
        assert!(!source.is_active());
        assert_eq!(camera.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn produces_frames_at_cadence() {
        let camera = Arc::new(CountingCamera::new(false));
        let mut source = CaptureSource::new(camera, Duration::from_millis(1500));

        let mut frames = source.activate().expect("activation should succeed");
        let frame = frames.recv().await.expect("frame should arrive");
        assert!(!frame.bytes.is_empty());

        source.deactivate();
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let camera = Arc::new(CountingCamera::new(false));
        let mut source = CaptureSource::new(camera.clone(), Duration::from_millis(10));

        let _frames = source.activate().unwrap();
        source.deactivate();
        source.deactivate();

        assert!(!source.is_active());
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reactivation_releases_previous_stream_first() {
        let camera = Arc::new(CountingCamera::new(false));
        let mut source = CaptureSource::new(camera.clone(), Duration::from_millis(10));

        let _first = source.activate().unwrap();
        let _second = source.activate().unwrap();

        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
        assert_eq!(camera.acquired.load(Ordering::SeqCst), 2);

        source.deactivate();
        assert_eq!(camera.released.load(Ordering::SeqCst), 2);
    }
}

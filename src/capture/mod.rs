mod source;

pub use source::CaptureSource;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::FacegateError;

/// One encoded camera snapshot. Immutable; consumed at most once by the
/// recognition loop, or dropped if the loop is busy or inactive.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub bytes: Arc<Vec<u8>>,
    pub captured_at: DateTime<Utc>,
}

impl CaptureFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            captured_at: Utc::now(),
        }
    }
}

/// Camera device abstraction. The stream is exclusively owned by
/// [`CaptureSource`]; no other component touches it directly.
pub trait Camera: Send + Sync + 'static {
    /// Acquire the device. Permission or device failures surface as
    /// [`FacegateError::CameraUnavailable`].
    fn acquire(&self) -> Result<(), FacegateError>;

    /// Grab one encoded frame (JPEG) from the acquired stream. May block.
    fn grab_frame(&self) -> Result<Vec<u8>, FacegateError>;

    /// Stop all underlying tracks. Must be idempotent.
    fn release(&self);
}

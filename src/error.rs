use thiserror::Error;

/// Errors surfaced by the entry workflow.
///
/// Per-attempt transport failures are absorbed by the recognition loop and
/// only escalate once the attempt budget is exhausted. `Cancelled` is always
/// swallowed by continuations and never shown to the user.
#[derive(Debug, Error)]
pub enum FacegateError {
    /// Camera permission denied or no device. Terminal: capture stops and the
    /// caller must offer the manual-registration path.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Network or timeout failure talking to the recognition backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend could not probe healthy before entering standby.
    #[error("recognition server unavailable: {0}")]
    ServerUnavailable(String),

    /// User-id lookup failed after a positive match. Recoverable: recognition
    /// retries after a cooldown.
    #[error("could not resolve profile for '{name}': {reason}")]
    ProfileResolution { name: String, reason: String },

    /// The owning surface was torn down while the operation was in flight.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FacegateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FacegateError::Cancelled)
    }
}

mod http;

pub use http::HttpRecognitionApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureFrame;
use crate::error::FacegateError;

/// Response of the face recognition endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeResponse {
    pub found: bool,
    pub user: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// Backend collaborators of the entry workflow. Implemented over HTTP in
/// production; test code substitutes fakes.
#[async_trait]
pub trait RecognitionApi: Send + Sync {
    /// Submit a frame to the face-matching endpoint.
    async fn recognize(&self, frame: &CaptureFrame) -> Result<RecognizeResponse, FacegateError>;

    /// Resolve the durable user id for a recognized name.
    async fn user_id_by_name(&self, name: &str) -> Result<String, FacegateError>;

    /// Open a server-side session record. Failures are non-fatal to callers.
    async fn start_session(&self, user_id: &str, user_name: &str) -> Result<(), FacegateError>;

    /// Close a server-side session record. Best-effort on logout.
    async fn end_session(&self, session_id: &str) -> Result<(), FacegateError>;

    /// Probe backend availability before entering standby.
    async fn health(&self) -> Result<(), FacegateError>;
}

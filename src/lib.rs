//! Face-recognition entry workflow for the self-assessment app.
//!
//! The crate owns the camera capture cadence ([`capture`]), the recognition
//! attempt loop ([`recognition`]), the session bootstrap that follows a
//! positive match ([`session`]), post-login presence monitoring
//! ([`presence`]), and the lifecycle/cancellation machinery ([`lifecycle`])
//! that makes all of it safe to tear down mid-flight. Rendering and the
//! backend's own matching logic stay outside, behind the [`api::RecognitionApi`]
//! and [`navigation::Navigator`] seams.

pub mod api;
pub mod capture;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod navigation;
pub mod presence;
pub mod recognition;
pub mod session;
pub mod utils;
pub mod welcome;

pub use api::{HttpRecognitionApi, RecognitionApi, RecognizeResponse};
pub use capture::{Camera, CaptureFrame, CaptureSource};
pub use config::{ApiSettings, RecognitionConfig, SettingsStore};
pub use db::Database;
pub use error::FacegateError;
pub use lifecycle::LifecycleGuard;
pub use models::SessionRecord;
pub use navigation::{Navigator, Route};
pub use presence::PresenceMonitor;
pub use recognition::{AttemptState, Outcome, RecognitionController};
pub use welcome::WelcomeFlow;

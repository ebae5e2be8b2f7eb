use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

/// Environment variable overriding the recognition API base URL.
pub const API_URL_ENV: &str = "FACEGATE_API_URL";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Cadences, timeouts, and the attempt budget of the entry workflow.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// Frame cadence while the entry surface waits for a login match.
    pub capture_interval: Duration,
    /// Frame cadence for post-login face polling (presence checks).
    pub poll_interval: Duration,
    /// Recognition attempts allowed before the loop gives up.
    pub max_attempts: u32,
    /// Bounded wait per recognition request.
    pub request_timeout: Duration,
    /// Bounded wait for the backend health probe.
    pub health_timeout: Duration,
    /// Display delay before navigating away after a terminal outcome.
    pub transition_delay: Duration,
    /// Cooldown before recognition retries after a failed profile lookup.
    pub retry_cooldown: Duration,
    /// How long the presence monitor tolerates not seeing the user.
    pub absence_timeout: Duration,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            capture_interval: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(1200),
            max_attempts: 30,
            request_timeout: Duration::from_secs(15),
            health_timeout: Duration::from_secs(3),
            transition_delay: Duration::from_millis(1500),
            retry_cooldown: Duration::from_secs(3),
            absence_timeout: Duration::from_secs(10),
        }
    }
}

/// Normalize a user-supplied base URL: trim, strip trailing slashes, and
/// assume https when no scheme is given (e.g. "myapp.up.railway.app").
pub fn normalize_api_base_url(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(trimmed.to_string());
    }

    Some(format!("https://{}", trimmed.trim_start_matches('/')))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
        }
    }
}

impl ApiSettings {
    /// Settings seeded from the environment, falling back to the local
    /// development backend.
    pub fn from_env() -> Self {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .and_then(|value| normalize_api_base_url(&value))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
        Self { base_url }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    api: ApiSettings,
}

/// JSON-file-backed settings, reloaded lazily and persisted on update.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn api(&self) -> ApiSettings {
        self.data.read().unwrap().api.clone()
    }

    pub fn update_api(&self, settings: ApiSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.api = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

use serde::{Deserialize, Serialize};

use crate::api::RecognizeResponse;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Shown when the attempt budget is consumed by a transport failure.
pub const CONNECTIVITY_MESSAGE: &str =
    "Could not reach the recognition service. Check your connection or use manual registration.";
/// Shown when the attempt budget runs out without a definitive match.
pub const NO_MATCH_MESSAGE: &str =
    "We couldn't recognize you. You can register manually to continue.";
/// Shown while recognition retries after a failed profile lookup.
pub const PROFILE_ERROR_MESSAGE: &str =
    "We recognized you but couldn't load your profile. Retrying...";

/// Resting outcome of the recognition loop.
///
/// Per-attempt results that keep the loop going (no face, transport failure)
/// never rest here; they are [`AttemptResult`] values that leave the outcome
/// at `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Pending,
    Matched { user_name: String },
    DetectedUnregistered,
    Exhausted,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Pending
    }
}

/// Classification of a single submit-and-await cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Matched(String),
    DetectedUnregistered,
    NotDetected,
    TransportError,
}

/// Classify a recognition response: a face with a known identity, a face
/// without one, or no face at all.
pub fn classify(response: &RecognizeResponse) -> AttemptResult {
    match (response.found, response.user.as_ref()) {
        (true, Some(user)) => AttemptResult::Matched(user.clone()),
        (true, None) => AttemptResult::DetectedUnregistered,
        (false, _) => AttemptResult::NotDetected,
    }
}

/// Progress of the recognition loop for one mount of the entry surface.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptState {
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub is_busy: bool,
    pub outcome: Outcome,
    /// User-facing message, set at most once per loop instance.
    pub message: Option<String>,
}

impl AttemptState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts_made: 0,
            max_attempts,
            is_busy: false,
            outcome: Outcome::Pending,
            message: None,
        }
    }

    /// Back to Pending/0, e.g. when the surface remounts or after a profile
    /// resolution cooldown.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_attempts);
    }

    /// Whether a new frame may start an attempt. False while busy, once a
    /// terminal outcome holds, or when the budget is spent.
    pub fn accepts_frame(&self) -> bool {
        !self.is_busy && !self.outcome.is_terminal() && self.attempts_made < self.max_attempts
    }

    pub fn begin_attempt(&mut self) {
        debug_assert!(self.accepts_frame());
        self.is_busy = true;
        self.attempts_made += 1;
    }

    /// Fold one attempt result into the loop outcome. Resets `is_busy` on
    /// every path; entering `Exhausted` happens exactly once, on the attempt
    /// that consumes the budget.
    pub fn complete_attempt(&mut self, result: AttemptResult) {
        self.is_busy = false;
        match result {
            AttemptResult::Matched(user_name) => {
                self.outcome = Outcome::Matched { user_name };
            }
            AttemptResult::DetectedUnregistered => {
                self.outcome = Outcome::DetectedUnregistered;
            }
            AttemptResult::NotDetected => {
                if self.budget_spent() {
                    self.exhaust(NO_MATCH_MESSAGE);
                }
            }
            AttemptResult::TransportError => {
                if self.budget_spent() {
                    self.exhaust(CONNECTIVITY_MESSAGE);
                }
            }
        }
    }

    fn budget_spent(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }

    fn exhaust(&mut self, message: &str) {
        self.outcome = Outcome::Exhausted;
        self.message = Some(message.to_string());
    }
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

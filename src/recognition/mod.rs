mod controller;
mod loop_worker;
mod state;

pub use controller::RecognitionController;
pub use loop_worker::{recognition_loop, LoopContext};
pub use state::{
    classify, AttemptResult, AttemptState, Outcome, CONNECTIVITY_MESSAGE, DEFAULT_MAX_ATTEMPTS,
    NO_MATCH_MESSAGE, PROFILE_ERROR_MESSAGE,
};

use serde::{Deserialize, Serialize};

/// Surfaces the workflow can transition to, invoked by name only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    /// The welcome/entry surface (logout target).
    Entry,
    /// Authenticated home after a successful login.
    Home,
    /// Registration flow for detected-but-unregistered faces.
    Register,
}

/// Performs navigation transitions. The host UI supplies the implementation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

use tokio_util::sync::CancellationToken;

/// Mount/teardown tracker shared by every asynchronous continuation of an
/// entry surface.
///
/// Continuations must call [`is_active`](Self::is_active) before mutating any
/// shared state, and long waits must race [`cancelled`](Self::cancelled) so
/// teardown interrupts them. `teardown` is idempotent; the underlying token
/// fires its signal once.
#[derive(Debug, Clone)]
pub struct LifecycleGuard {
    token: CancellationToken,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves when the surface is torn down.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Token for binding in-flight operations spawned on behalf of this
    /// surface.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn teardown(&self) {
        self.token.cancel();
    }
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}

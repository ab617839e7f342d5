use crate::entity::UserId;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Deferred auto-expiry of active pairs.
///
/// One background task runs per pair; each participant holds a handle on the
/// same cancellation token, so cancelling either side disarms the pair's timer.
/// The expiry callback still has to re-check the pair before acting, because a
/// timer that has already woken up cannot be recalled.
#[derive(Debug, Default)]
pub struct SessionTimer {
    handles: HashMap<UserId, CancellationToken>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer for the pair `(a, b)`. Must be called within a tokio runtime.
    pub fn schedule<F, Fut>(
        &mut self,
        a: UserId,
        b: UserId,
        session_id: Uuid,
        duration: Duration,
        on_expire: F,
    ) where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel(a);
        self.cancel(b);

        let token = CancellationToken::new();
        self.handles.insert(a, token.clone());
        self.handles.insert(b, token.clone());

        // Deadline is fixed here, not when the task is first polled.
        let deadline = tokio::time::sleep(duration);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Timer for session {} cancelled", session_id);
                }
                _ = deadline => {
                    on_expire().await;
                }
            }
        });
    }

    /// Idempotent.
    pub fn cancel(&mut self, user: UserId) {
        if let Some(token) = self.handles.remove(&user) {
            token.cancel();
        }
    }

    pub fn is_pending(&self, user: UserId) -> bool {
        self.handles
            .get(&user)
            .is_some_and(|token| !token.is_cancelled())
    }
}

use crate::classify::Classification;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of one attempt inside a logical call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Succeeded { status: u16 },
    Failed(Classification),
}

/// One entry of the append-only attempt history of a logical call.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based ordinal.
    pub attempt: u32,
    pub elapsed: Duration,
    pub result: AttemptResult,
    /// Backoff slept after this attempt, if another attempt followed.
    pub backoff: Option<Duration>,
}

/// Per-call stats for observability.
#[derive(Debug, Clone)]
pub struct CallStats {
    pub destination: String,
    pub attempts: u32,
    pub retry_count: u32,
    pub duration_ms: u128,
    pub client_request_id: String,
    pub history: Vec<AttemptRecord>,
}

/// Cancels an in-flight logical call: the current attempt is aborted, any
/// pending backoff is skipped, and the call resolves to `Error::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Handle that is cancelled together with this one, but can also be cancelled alone.
    pub fn child(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.child_token(),
        }
    }

    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn child_follows_parent() {
        let parent = CancelHandle::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
        child.cancelled().await;
    }

    #[test]
    fn cancelling_child_leaves_parent() {
        let parent = CancelHandle::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }
}

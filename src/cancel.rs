use tokio_util::sync::CancellationToken;

/// Cooperative stop request shared between the caller and every worker of a run.
///
/// The flag only ever moves from "running" to "cancelled". Workers poll it before
/// claiming a batch and again after each model call returns; an in-flight call is
/// never interrupted, so a stop takes effect within one call latency.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent; a no-op once the run has finished.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("stop requested; in-flight model calls will finish and be discarded");
        }
        self.token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_flag() {
        let a = CancelSignal::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        a.cancel();
        assert!(b.is_cancelled());
    }
}

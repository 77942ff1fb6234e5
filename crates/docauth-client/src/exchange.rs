//! Handles for one in-flight request.

use crate::domain::{ClientError, ExchangeOutcome};
use crate::service::SessionShared;
use docauth_types::{ClientFrame, RequestId, VerificationResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// A submitted request whose result has not been collected yet.
///
/// Dropping it before the outcome arrives abandons the request: its
/// correlation entry is removed and the engine is asked to cancel.
pub struct PendingExchange {
    id: RequestId,
    rx: oneshot::Receiver<ExchangeOutcome>,
    shared: Arc<SessionShared>,
    resolved: bool,
}

impl std::fmt::Debug for PendingExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingExchange")
            .field("id", &self.id)
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

impl PendingExchange {
    pub(crate) fn new(
        id: RequestId,
        rx: oneshot::Receiver<ExchangeOutcome>,
        shared: Arc<SessionShared>,
    ) -> Self {
        Self {
            id,
            rx,
            shared,
            resolved: false,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// A handle that can cancel this exchange from another task.
    pub fn canceller(&self) -> ExchangeCanceller {
        ExchangeCanceller {
            id: self.id,
            shared: self.shared.clone(),
        }
    }

    /// Wait for the outcome, bounded by the session's default deadline when
    /// one is configured.
    pub async fn wait(self) -> Result<VerificationResult, ClientError> {
        match self.shared.default_deadline() {
            Some(deadline) => self.wait_with_deadline(deadline).await,
            None => self.wait_unbounded().await,
        }
    }

    async fn wait_unbounded(mut self) -> Result<VerificationResult, ClientError> {
        let outcome = (&mut self.rx).await;
        self.resolved = true;
        outcome.unwrap_or(Err(ClientError::Disposed))
    }

    /// Wait at most `deadline` for the outcome.
    ///
    /// On expiry the exchange is abandoned, the engine is asked to cancel,
    /// and [`ClientError::Timeout`] is returned. A result arriving later is
    /// dropped.
    pub async fn wait_with_deadline(
        mut self,
        deadline: Duration,
    ) -> Result<VerificationResult, ClientError> {
        let waited = tokio::time::timeout(deadline, &mut self.rx).await;
        self.resolved = true;

        match waited {
            Ok(outcome) => outcome.unwrap_or(Err(ClientError::Disposed)),
            Err(_) => {
                if self.shared.pending.time_out(self.id, deadline) {
                    self.shared.send_best_effort(ClientFrame::Cancel {
                        request_id: self.id,
                    });
                    return Err(ClientError::Timeout {
                        request_id: self.id,
                        after: deadline,
                    });
                }
                // Resolved in the same instant the deadline fired.
                match self.rx.try_recv() {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ClientError::Timeout {
                        request_id: self.id,
                        after: deadline,
                    }),
                }
            }
        }
    }
}

impl Drop for PendingExchange {
    fn drop(&mut self) {
        if !self.resolved && self.shared.pending.remove(self.id) {
            debug!(request_id = %self.id, "Exchange dropped before its outcome");
            self.shared.send_best_effort(ClientFrame::Cancel {
                request_id: self.id,
            });
        }
    }
}

/// Cancels one exchange. Cheap to clone and safe to move across tasks.
#[derive(Clone)]
pub struct ExchangeCanceller {
    id: RequestId,
    shared: Arc<SessionShared>,
}

impl ExchangeCanceller {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Resolve the exchange as cancelled and tell the engine.
    ///
    /// Returns false when the exchange already had an outcome.
    pub fn cancel(&self) -> bool {
        if !self.shared.pending.cancel(self.id) {
            return false;
        }
        self.shared.send_best_effort(ClientFrame::Cancel {
            request_id: self.id,
        });
        true
    }
}

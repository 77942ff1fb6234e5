//! Pending Exchange Store - correlation table for in-flight requests.
//!
//! Maps request ids to the waiter of each exchange. Responses, failures,
//! cancellations and timeouts all resolve an entry by removing it, so each
//! request is resolved at most once and a late response finds nothing.

use crate::domain::error::ClientError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docauth_telemetry::metrics::outcome;
use docauth_telemetry::{EXCHANGES_IN_FLIGHT, EXCHANGES_TOTAL, EXCHANGE_DURATION};
use docauth_types::{RequestId, VerificationResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// What a waiter eventually receives.
pub type ExchangeOutcome = Result<VerificationResult, ClientError>;

/// A pending exchange waiting for the engine
struct PendingEntry {
    /// Channel to the waiter
    sender: oneshot::Sender<ExchangeOutcome>,
    /// When the request was registered
    created_at: Instant,
}

/// Statistics for the pending exchange store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total exchanges registered
    pub total_registered: AtomicU64,
    /// Total exchanges completed with a result
    pub total_completed: AtomicU64,
    /// Total exchanges failed (engine, transport or disposal)
    pub total_failed: AtomicU64,
    /// Total exchanges cancelled by the caller
    pub total_cancelled: AtomicU64,
    /// Total exchanges abandoned at their deadline
    pub total_timeouts: AtomicU64,
}

/// Correlation table for in-flight exchanges.
///
/// Flow:
/// 1. `submit` calls `register()` with the request id and keeps the receiver
/// 2. The request frame is written to the engine
/// 3. The receive task calls `complete()` / `fail()` when the engine answers
/// 4. The waiter awaits the receiver, or resolves the entry itself via
///    `cancel()` / `time_out()` / `remove()`
#[derive(Default)]
pub struct PendingExchangeStore {
    pending: DashMap<RequestId, PendingEntry>,
    stats: PendingStats,
}

impl PendingExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request and get the receiver for its outcome.
    pub fn register(
        &self,
        request_id: RequestId,
    ) -> Result<oneshot::Receiver<ExchangeOutcome>, ClientError> {
        let (tx, rx) = oneshot::channel();

        match self.pending.entry(request_id) {
            Entry::Occupied(_) => return Err(ClientError::DuplicateRequest(request_id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    sender: tx,
                    created_at: Instant::now(),
                });
            }
        }

        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        EXCHANGES_IN_FLIGHT.inc();
        debug!(request_id = %request_id, "Registered pending exchange");

        Ok(rx)
    }

    /// Deliver a result to the waiter of `result.request_id`.
    ///
    /// Returns false for unknown or already resolved ids.
    pub fn complete(&self, result: VerificationResult) -> bool {
        let request_id = result.request_id;
        let Some(entry) = self.take(request_id, outcome::COMPLETED) else {
            warn!(request_id = %request_id, "Result for unknown or resolved request dropped");
            return false;
        };

        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            request_id = %request_id,
            status = %result.overall_status,
            response_time_ms = entry.created_at.elapsed().as_millis(),
            "Completed pending exchange"
        );
        Self::deliver(entry, Ok(result))
    }

    /// Fail one exchange with `error`.
    pub fn fail(&self, request_id: RequestId, error: ClientError) -> bool {
        let Some(entry) = self.take(request_id, error.outcome_label()) else {
            warn!(request_id = %request_id, error = %error, "Failure for unknown or resolved request dropped");
            return false;
        };

        self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = %request_id, error = %error, "Failed pending exchange");
        Self::deliver(entry, Err(error))
    }

    /// Resolve an exchange as cancelled. The waiter wakes with
    /// [`ClientError::Cancelled`].
    pub fn cancel(&self, request_id: RequestId) -> bool {
        let Some(entry) = self.take(request_id, outcome::CANCELLED) else {
            return false;
        };

        self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = %request_id, "Cancelled pending exchange");
        Self::deliver(entry, Err(ClientError::Cancelled { request_id }))
    }

    /// Drop an exchange whose waiter gave up at its deadline.
    pub fn time_out(&self, request_id: RequestId, after: Duration) -> bool {
        if self.take(request_id, outcome::TIMEOUT).is_none() {
            return false;
        }

        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            request_id = %request_id,
            deadline_ms = after.as_millis(),
            "Exchange abandoned at deadline"
        );
        true
    }

    /// Remove an exchange without resolving it (its waiter is gone).
    pub fn remove(&self, request_id: RequestId) -> bool {
        let removed = self.take(request_id, outcome::CANCELLED).is_some();
        if removed {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = %request_id, "Removed abandoned exchange");
        }
        removed
    }

    /// Fail every pending exchange. Returns how many were failed.
    pub fn fail_all<F>(&self, make_error: F) -> usize
    where
        F: Fn(RequestId) -> ClientError,
    {
        let ids: Vec<RequestId> = self.pending.iter().map(|e| *e.key()).collect();
        ids.into_iter()
            .filter(|id| self.fail(*id, make_error(*id)))
            .count()
    }

    /// Get number of currently pending exchanges
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a request is pending
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    fn take(&self, request_id: RequestId, outcome_label: &str) -> Option<PendingEntry> {
        let (_, entry) = self.pending.remove(&request_id)?;
        EXCHANGES_IN_FLIGHT.dec();
        EXCHANGES_TOTAL.with_label_values(&[outcome_label]).inc();
        EXCHANGE_DURATION.observe(entry.created_at.elapsed().as_secs_f64());
        Some(entry)
    }

    fn deliver(entry: PendingEntry, outcome: ExchangeOutcome) -> bool {
        // The waiter may have been dropped between removal and delivery.
        entry.sender.send(outcome).is_ok()
    }
}

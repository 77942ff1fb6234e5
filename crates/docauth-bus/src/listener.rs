//! # Callback Listeners
//!
//! Push-side of the bus. Each listener owns a subscription and runs its
//! callbacks on a dedicated task, so a slow or failing callback only delays
//! itself: publishing never waits for it and the exchange path never sees it.

use crate::events::{EngineErrorReport, EngineEvent, StageChanged};
use crate::subscriber::Subscription;
use docauth_telemetry::LISTENER_FAILURES;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a running listener.
///
/// Dropping the handle detaches the listener; it keeps running until the
/// bus closes. Call [`cancel`](Self::cancel) to stop it early.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop delivering events. Events already being delivered finish first.
    pub fn cancel(&self) {
        self.stop.notify_one();
    }

    /// Whether the listener task has exited (cancelled or bus closed).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the listener task to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "Listener task ended abnormally");
        }
    }
}

/// Spawn a listener task over `subscription`.
///
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_listener<S, E>(
    mut subscription: Subscription,
    on_stage: S,
    on_error: E,
) -> ListenerHandle
where
    S: Fn(&StageChanged) + Send + 'static,
    E: Fn(&EngineErrorReport) + Send + 'static,
{
    let stop = Arc::new(Notify::new());
    let stop_signal = stop.clone();

    let task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                _ = stop_signal.notified() => {
                    debug!("Listener cancelled");
                    break;
                }
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!("Event bus closed, listener exiting");
                        break;
                    }
                },
            };

            let delivered = catch_unwind(AssertUnwindSafe(|| match &event {
                EngineEvent::StageChanged(stage) => on_stage(stage),
                EngineEvent::ErrorReported(report) => on_error(report),
            }));

            if delivered.is_err() {
                LISTENER_FAILURES.inc();
                warn!(kind = event.kind().as_str(), "Listener callback panicked, event skipped");
            }
        }
    });

    ListenerHandle { stop, task }
}

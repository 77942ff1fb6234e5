//! # Event Flows
//!
//! Stage and error notifications travel on the event bus next to, never
//! instead of, exchange results. No ordering between the two paths is
//! assumed here.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use docauth_bus::{EngineEvent, EventFilter, EventKind};
    use docauth_client::{AuthenticationSession, ClientError, LoopbackEngine, SessionConfig};
    use docauth_types::{ScanEvidence, VerificationRequest, VerificationResult, VerificationStatus};
    use parking_lot::Mutex;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    async fn ready_session(engine: &LoopbackEngine) -> AuthenticationSession {
        let session = AuthenticationSession::new(engine.clone());
        session.initialize(SessionConfig::default()).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_request_stages_and_result_both_arrive() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let exchange = session
            .submit(VerificationRequest::new(ScanEvidence::default()))
            .await
            .unwrap();
        let id = exchange.id();
        let mut stream = session.events(EventFilter::for_request(id));

        engine.emit_stage(None, "Warming up");
        engine.emit_stage(Some(id), "Loading images");
        engine.respond(VerificationResult::new(id, VerificationStatus::Passed));
        engine.emit_stage(Some(id), "Done");

        assert!(exchange.wait().await.is_ok());

        let mut stages = Vec::new();
        for _ in 0..2 {
            match timeout(Duration::from_secs(1), stream.next()).await.unwrap() {
                Some(EngineEvent::StageChanged(s)) => stages.push(s.stage),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(stages, vec!["Loading images", "Done"]);
        session.dispose().await;
    }

    #[tokio::test]
    async fn test_error_notifications_do_not_fail_exchanges() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;
        let mut errors = session.events(EventFilter::kinds(vec![EventKind::Error]));

        let exchange = session
            .submit(VerificationRequest::new(ScanEvidence::default()))
            .await
            .unwrap();
        let id = exchange.id();

        engine.emit_error(Some(id), "glare on front image");
        engine.respond(VerificationResult::new(id, VerificationStatus::Indeterminate));

        let result = exchange.wait().await.unwrap();
        assert_eq!(result.overall_status, VerificationStatus::Indeterminate);

        let event = timeout(Duration::from_secs(1), errors.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.request_id(), Some(id));
        session.dispose().await;
    }

    /// An error notification and the failure it explains travel on separate
    /// paths, so either may land first. Both must reach the caller.
    #[tokio::test]
    async fn test_error_event_and_failure_in_either_order() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        for error_first in [true, false] {
            let exchange = session
                .submit(VerificationRequest::new(ScanEvidence::default()))
                .await
                .unwrap();
            let id = exchange.id();
            let mut errors = session.events(EventFilter::for_request(id));

            if error_first {
                engine.emit_error(Some(id), "face image unreadable");
                engine.fail(id, "no usable face image");
            } else {
                engine.fail(id, "no usable face image");
                engine.emit_error(Some(id), "face image unreadable");
            }

            match exchange.wait().await {
                Err(ClientError::EngineReported { request_id, message }) => {
                    assert_eq!(request_id, id);
                    assert_eq!(message, "no usable face image");
                }
                other => panic!("unexpected outcome: {other:?}"),
            }

            match timeout(Duration::from_secs(1), errors.next()).await.unwrap() {
                Some(EngineEvent::ErrorReported(report)) => {
                    assert_eq!(report.request_id, Some(id));
                    assert_eq!(report.text, "face image unreadable");
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert_eq!(session.pending_count(), 0);
        session.dispose().await;
    }

    #[tokio::test]
    async fn test_panicking_callback_keeps_listener_alive() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        let listener = session.subscribe(
            move |stage| {
                counter.fetch_add(1, Ordering::SeqCst);
                if stage.stage == "boom" {
                    panic!("subscriber bug");
                }
            },
            |_| {},
        );

        engine.emit_stage(None, "boom");
        engine.emit_stage(None, "after");

        for _ in 0..50 {
            if delivered.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        assert!(!listener.is_finished());

        session.dispose().await;
        timeout(Duration::from_secs(1), listener.join()).await.unwrap();
    }

    #[tokio::test]
    async fn test_link_loss_is_reported_as_event() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let _listener = session.subscribe(|_| {}, move |e| sink.lock().push(e.clone()));

        engine.sever();

        for _ in 0..50 {
            if !reports.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let reports = reports.lock().clone();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].request_id, None);
        assert!(reports[0].text.contains("link lost"));
        session.dispose().await;
    }

    #[tokio::test]
    async fn test_streams_end_on_dispose() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;
        let mut stream = session.events(EventFilter::all());

        session.dispose().await;
        assert!(timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .is_none());
    }
}

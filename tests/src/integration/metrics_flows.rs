//! # Metrics Flows
//!
//! Exchange and event activity shows up in the Prometheus exposition.
//! Collectors are process-wide, so assertions only look at growth.

#[cfg(test)]
mod tests {
    use docauth_client::{AuthenticationSession, LoopbackEngine, SessionConfig};
    use docauth_bus::{EventFilter, EventKind};
    use docauth_telemetry::metrics::outcome;
    use docauth_telemetry::{register_metrics, ENGINE_EVENTS_TOTAL, EXCHANGES_TOTAL};
    use tokio_stream::StreamExt;
    use docauth_types::{ScanEvidence, VerificationRequest, VerificationResult, VerificationStatus};

    #[tokio::test]
    async fn test_exchange_outcomes_are_counted() {
        let metrics = register_metrics().unwrap();
        let completed = EXCHANGES_TOTAL.with_label_values(&[outcome::COMPLETED]);
        let engine_failed = EXCHANGES_TOTAL.with_label_values(&[outcome::ENGINE_FAILED]);
        let before = (completed.get(), engine_failed.get());

        let engine = LoopbackEngine::new();
        let session = AuthenticationSession::new(engine.clone());
        session.initialize(SessionConfig::default()).await.unwrap();

        let ok = session
            .submit(VerificationRequest::new(ScanEvidence::default()))
            .await
            .unwrap();
        let bad = session
            .submit(VerificationRequest::new(ScanEvidence::default()))
            .await
            .unwrap();
        engine.respond(VerificationResult::new(ok.id(), VerificationStatus::Passed));
        engine.fail(bad.id(), "unreadable barcode");
        assert!(ok.wait().await.is_ok());
        assert!(bad.wait().await.is_err());
        session.dispose().await;

        assert!(completed.get() >= before.0 + 1);
        assert!(engine_failed.get() >= before.1 + 1);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("docauth_exchanges_total"));
        assert!(text.contains("docauth_exchange_duration_seconds"));
    }

    #[tokio::test]
    async fn test_stage_events_are_counted() {
        register_metrics().unwrap();
        let stages = ENGINE_EVENTS_TOTAL.with_label_values(&[EventKind::Stage.as_str()]);
        let before = stages.get();

        let engine = LoopbackEngine::new();
        let session = AuthenticationSession::new(engine.clone());
        session.initialize(SessionConfig::default()).await.unwrap();
        let mut events = session.events(EventFilter::all());

        engine.emit_stage(None, "Reading chip");
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), events.next()).await;
        session.dispose().await;

        assert!(stages.get() >= before + 1);
    }
}

//! # Session Flows
//!
//! Drives `AuthenticationSession` end to end against the in-process
//! loopback engine:
//!
//! 1. **Lifecycle**: initialize/dispose cycles release every channel
//! 2. **Correlation**: concurrent requests answered in any order reach their
//!    own callers
//! 3. **Deadlines and cancellation**: abandoned requests leave nothing behind
//! 4. **Failure isolation**: one failed exchange does not disturb the others

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use docauth_client::{
        AuthenticationSession, ClientError, EngineReply, HandshakeMode, LoopbackEngine,
        SessionConfig, SessionState,
    };
    use docauth_types::{
        ImageSlot, RawSource, ScanEvidence, VerificationRequest, VerificationResult,
        VerificationStatus,
    };
    use proptest::prelude::*;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn config() -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_secs(1),
            ..SessionConfig::default()
        }
    }

    fn front_and_back() -> ScanEvidence {
        ScanEvidence::builder()
            .image(ImageSlot::ColorFront, b"front".to_vec())
            .image(ImageSlot::ColorBack, b"back".to_vec())
            .raw(RawSource::Pdf417, "@ANSI 636000")
            .build()
    }

    async fn ready_session(engine: &LoopbackEngine) -> Arc<AuthenticationSession> {
        let session = Arc::new(AuthenticationSession::new(engine.clone()));
        session.initialize(config()).await.unwrap();
        session
    }

    /// Engine that crops every submitted image when asked to.
    fn cropping_reply(request: &VerificationRequest) -> EngineReply {
        let mut result = VerificationResult::new(request.id(), VerificationStatus::Passed);
        if request.options().crop_required {
            for slot in request.evidence().slots() {
                result.processed_images.insert(slot, format!("cropped-{slot}").into_bytes());
            }
        }
        EngineReply::Complete(result)
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_repeated_cycles_leak_no_channels() {
        let engine = LoopbackEngine::new();
        let _server = engine.serve(cropping_reply);

        for _ in 0..10 {
            let session = AuthenticationSession::new(engine.clone());
            session.initialize(config()).await.unwrap();
            session
                .process(VerificationRequest::new(front_and_back()))
                .await
                .unwrap();
            session.dispose().await;

            assert_eq!(engine.open_channels(), 0);
        }

        assert_eq!(engine.connect_attempts(), 10);
        assert_eq!(engine.close_calls(), 10);
        assert_eq!(engine.goodbyes(), 10);
    }

    #[tokio::test]
    async fn test_dispose_without_initialize_and_twice() {
        let engine = LoopbackEngine::new();

        let idle = AuthenticationSession::new(engine.clone());
        idle.dispose().await;
        idle.dispose().await;
        assert_eq!(idle.state(), SessionState::Uninitialized);
        assert_eq!(engine.connect_attempts(), 0);

        let session = ready_session(&engine).await;
        session.dispose().await;
        session.dispose().await;
        assert_eq!(session.state(), SessionState::Disposed);
        assert_eq!(engine.close_calls(), 1);
        assert_eq!(engine.open_channels(), 0);
    }

    #[tokio::test]
    async fn test_rejected_handshake_then_dispose() {
        let engine = LoopbackEngine::with_mode(HandshakeMode::Reject("unsupported host".into()));
        let session = AuthenticationSession::new(engine.clone());

        assert!(matches!(
            session.initialize(config()).await,
            Err(ClientError::Connection(_))
        ));
        assert_eq!(session.state(), SessionState::Failed);

        session.dispose().await;
        assert_eq!(session.state(), SessionState::Disposed);
        assert_eq!(engine.open_channels(), 0);
    }

    #[tokio::test]
    async fn test_dispose_while_initializing() {
        let engine = LoopbackEngine::with_mode(HandshakeMode::Silent);
        let session = Arc::new(AuthenticationSession::new(engine.clone()));

        let init = {
            let session = session.clone();
            tokio::spawn(async move { session.initialize(config()).await })
        };
        while session.state() != SessionState::Initializing || engine.connect_attempts() == 0 {
            tokio::task::yield_now().await;
        }

        session.dispose().await;
        assert_eq!(init.await.unwrap().unwrap_err(), ClientError::Disposed);
        assert_eq!(session.state(), SessionState::Disposed);
        assert_eq!(engine.open_channels(), 0);
    }

    // =============================================================================
    // CORRELATION
    // =============================================================================

    #[tokio::test]
    async fn test_reverse_order_responses_reach_their_callers() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let mut waiters = Vec::new();
        for _ in 0..5 {
            let session = session.clone();
            waiters.push(tokio::spawn(async move {
                let request = VerificationRequest::new(front_and_back());
                let id = request.id();
                (id, session.process(request).await)
            }));
        }

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(engine.next_request().await.unwrap());
        }
        for (i, request) in seen.iter().enumerate().rev() {
            let status = if i % 2 == 0 {
                VerificationStatus::Passed
            } else {
                VerificationStatus::Failed
            };
            engine.respond(VerificationResult::new(request.id(), status));
        }

        for waiter in waiters {
            let (id, outcome) = waiter.await.unwrap();
            assert_eq!(outcome.unwrap().request_id, id);
        }
        assert_eq!(session.pending_count(), 0);
        session.dispose().await;
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_any_response_order_is_matched(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let engine = LoopbackEngine::new();
                let session = ready_session(&engine).await;

                let mut exchanges = Vec::new();
                for _ in 0..order.len() {
                    let exchange = session
                        .submit(VerificationRequest::new(ScanEvidence::default()))
                        .await
                        .unwrap();
                    exchanges.push(exchange);
                }
                let ids: Vec<_> = exchanges.iter().map(|e| e.id()).collect();

                for &i in &order {
                    engine.respond(VerificationResult::new(ids[i], VerificationStatus::Passed));
                }
                for (exchange, id) in exchanges.into_iter().zip(ids) {
                    assert_eq!(exchange.wait().await.unwrap().request_id, id);
                }
                session.dispose().await;
            });
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let doomed = session
            .submit(VerificationRequest::new(front_and_back()))
            .await
            .unwrap();
        let healthy = session
            .submit(VerificationRequest::new(front_and_back()))
            .await
            .unwrap();

        engine.fail(doomed.id(), "image too dark");
        engine.respond(VerificationResult::new(healthy.id(), VerificationStatus::Passed));

        assert!(matches!(
            doomed.wait().await,
            Err(ClientError::EngineReported { .. })
        ));
        assert!(healthy.wait().await.unwrap().is_passed());
        assert_eq!(session.state(), SessionState::Ready);
        session.dispose().await;
    }

    // =============================================================================
    // CROPPING
    // =============================================================================

    #[tokio::test]
    async fn test_processed_images_match_submitted_slots() {
        let engine = LoopbackEngine::new();
        let _server = engine.serve(cropping_reply);
        let session = ready_session(&engine).await;

        let cropped = session
            .process(VerificationRequest::new(front_and_back()).with_crop_required(true))
            .await
            .unwrap();
        let slots: Vec<_> = cropped.processed_slots().collect();
        assert_eq!(slots, vec![ImageSlot::ColorFront, ImageSlot::ColorBack]);
        assert_eq!(
            cropped.processed_images[&ImageSlot::ColorBack],
            b"cropped-ColorBack".to_vec()
        );

        let uncropped = session
            .process(VerificationRequest::new(front_and_back()))
            .await
            .unwrap();
        assert!(uncropped.processed_images.is_empty());
        session.dispose().await;
    }

    // =============================================================================
    // DEADLINES AND CANCELLATION
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_two_second_deadline() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let started = tokio::time::Instant::now();
        let err = session
            .process_with_deadline(
                VerificationRequest::new(front_and_back()),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout { after, .. } if after == Duration::from_secs(2)));
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.state(), SessionState::Ready);

        // The abandoned request does not poison the next one.
        let stale = engine.next_request().await.unwrap();
        engine.respond(VerificationResult::new(stale.id(), VerificationStatus::Passed));
        let _server = engine.serve(cropping_reply);
        assert!(session
            .process(VerificationRequest::new(front_and_back()))
            .await
            .is_ok());

        session.dispose().await;
        assert_eq!(engine.cancels(), vec![stale.id()]);
    }

    #[tokio::test]
    async fn test_cancel_from_another_task() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let exchange = session
            .submit(VerificationRequest::new(front_and_back()))
            .await
            .unwrap();
        let id = exchange.id();
        let canceller = exchange.canceller();

        let waiter = tokio::spawn(exchange.wait());
        tokio::spawn(async move { canceller.cancel() })
            .await
            .unwrap();

        assert_eq!(
            waiter.await.unwrap().unwrap_err(),
            ClientError::Cancelled { request_id: id }
        );
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.pending_stats().total_cancelled.load(std::sync::atomic::Ordering::Relaxed), 1);
        session.dispose().await;
    }

    // =============================================================================
    // LINK LOSS
    // =============================================================================

    #[tokio::test]
    async fn test_link_loss_fails_every_in_flight_exchange() {
        let engine = LoopbackEngine::new();
        let session = ready_session(&engine).await;

        let mut exchanges = Vec::new();
        for _ in 0..3 {
            exchanges.push(
                session
                    .submit(VerificationRequest::new(front_and_back()))
                    .await
                    .unwrap(),
            );
        }
        engine.sever();

        for exchange in exchanges {
            assert!(matches!(
                exchange.wait().await,
                Err(ClientError::Transport(_))
            ));
        }
        assert_eq!(session.state(), SessionState::Failed);

        session.dispose().await;
        assert_eq!(engine.open_channels(), 0);
    }
}

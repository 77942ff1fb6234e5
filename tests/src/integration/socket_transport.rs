//! # Socket Transport
//!
//! Real Unix domain socket between the session and a scripted engine that
//! speaks the framed protocol directly.

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use docauth_client::adapters::framing::{read_frame, write_frame};
    use docauth_client::{
        AuthenticationSession, ClientError, LocalSocketConnector, SessionConfig, SessionState,
    };
    use docauth_types::{
        ClientFrame, EngineFrame, ImageSlot, ScanEvidence, VerificationRequest,
        VerificationResult, VerificationStatus, PROTOCOL_VERSION,
    };
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixListener;
    use tokio::task::JoinHandle;

    fn config_for(socket: &Path) -> SessionConfig {
        SessionConfig {
            channel_address: Some(socket.to_string_lossy().into_owned()),
            connect_timeout: Duration::from_secs(2),
            ..SessionConfig::default()
        }
    }

    /// Accept one client, answer every request with a cropped pass, and
    /// return the frames the client sent.
    fn scripted_engine(listener: UnixListener) -> JoinHandle<Vec<ClientFrame>> {
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            let mut received = Vec::new();

            while let Some(frame) = read_frame::<_, ClientFrame>(&mut reader).await.unwrap() {
                match &frame {
                    ClientFrame::Hello { .. } => {
                        let welcome = EngineFrame::Welcome {
                            protocol_version: PROTOCOL_VERSION,
                            engine_version: "scripted-2.1".into(),
                        };
                        write_frame(&mut writer, &welcome).await.unwrap();
                    }
                    ClientFrame::Process { request } => {
                        let stage = EngineFrame::Stage {
                            request_id: Some(request.id()),
                            stage: "Analyzing".into(),
                        };
                        write_frame(&mut writer, &stage).await.unwrap();

                        let mut result =
                            VerificationResult::new(request.id(), VerificationStatus::Passed);
                        for slot in request.evidence().slots() {
                            result.processed_images.insert(slot, vec![0xFF, 0xD8]);
                        }
                        write_frame(&mut writer, &EngineFrame::Completed { result })
                            .await
                            .unwrap();
                    }
                    ClientFrame::Cancel { .. } | ClientFrame::Goodbye => {}
                }
                received.push(frame);
            }
            received
        })
    }

    #[tokio::test]
    async fn test_full_session_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("engine.sock");
        let engine = scripted_engine(UnixListener::bind(&socket).unwrap());

        let session = AuthenticationSession::new(LocalSocketConnector::new());
        session.initialize(config_for(&socket)).await.unwrap();
        assert_eq!(session.engine_version().as_deref(), Some("scripted-2.1"));

        let evidence = ScanEvidence::builder()
            .image(ImageSlot::ColorFront, vec![1u8; 256 * 1024])
            .build();
        let result = session
            .process(VerificationRequest::new(evidence).with_crop_required(true))
            .await
            .unwrap();
        assert!(result.is_passed());
        assert_eq!(result.processed_images[&ImageSlot::ColorFront], vec![0xFF, 0xD8]);

        session.dispose().await;

        let received = engine.await.unwrap();
        let names: Vec<_> = received.iter().map(ClientFrame::name).collect();
        assert_eq!(names, vec!["hello", "process", "goodbye"]);
    }

    #[tokio::test]
    async fn test_engine_exit_fails_session() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let engine = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            let _hello: Option<ClientFrame> = read_frame(&mut reader).await.unwrap();
            write_frame(
                &mut writer,
                &EngineFrame::Welcome {
                    protocol_version: PROTOCOL_VERSION,
                    engine_version: "crashy".into(),
                },
            )
            .await
            .unwrap();
            let _process: Option<ClientFrame> = read_frame(&mut reader).await.unwrap();
            // Engine process dies with the request in flight.
        });

        let session = AuthenticationSession::new(LocalSocketConnector::new());
        session.initialize(config_for(&socket)).await.unwrap();

        let outcome = session
            .process(VerificationRequest::new(ScanEvidence::default()))
            .await;
        engine.await.unwrap();

        assert!(matches!(outcome, Err(ClientError::Transport(_))));
        assert_eq!(session.state(), SessionState::Failed);
        session.dispose().await;
    }

    #[tokio::test]
    async fn test_no_engine_listening() {
        let dir = tempfile::tempdir().unwrap();
        let session = AuthenticationSession::new(LocalSocketConnector::new());

        let err = session
            .initialize(config_for(&dir.path().join("absent.sock")))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
        assert_eq!(session.state(), SessionState::Failed);
        session.dispose().await;
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            let _hello: Option<ClientFrame> = read_frame(&mut reader).await.unwrap();
            write_frame(
                &mut writer,
                &EngineFrame::Welcome {
                    protocol_version: PROTOCOL_VERSION + 1,
                    engine_version: "future".into(),
                },
            )
            .await
            .unwrap();
        });

        let session = AuthenticationSession::new(LocalSocketConnector::new());
        let err = session.initialize(config_for(&socket)).await.unwrap_err();
        assert!(matches!(&err, ClientError::Connection(m) if m.contains("protocol")));
    }

    #[tokio::test]
    async fn test_undecodable_result_fails_its_request() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            let _hello: Option<ClientFrame> = read_frame(&mut reader).await.unwrap();
            write_frame(
                &mut writer,
                &EngineFrame::Welcome {
                    protocol_version: PROTOCOL_VERSION,
                    engine_version: "sloppy".into(),
                },
            )
            .await
            .unwrap();

            let Some(ClientFrame::Process { request }) =
                read_frame::<_, ClientFrame>(&mut reader).await.unwrap()
            else {
                panic!("expected a process frame");
            };
            let body = serde_json::to_vec(&serde_json::json!({
                "type": "completed",
                "result": {
                    "request_id": request.id(),
                    "overall_status": "Passed",
                    "test_outcomes": [{
                        "name": "Hologram",
                        "group": "Document",
                        "status": "Passed",
                        "confidence": 1.5,
                        "kind": "Visual"
                    }]
                }
            }))
            .unwrap();
            writer
                .write_all(&(body.len() as u32).to_be_bytes())
                .await
                .unwrap();
            writer.write_all(&body).await.unwrap();

            // Keep the link up so only the bad answer can end the exchange.
            while read_frame::<_, ClientFrame>(&mut reader).await.unwrap().is_some() {}
        });

        let session = AuthenticationSession::new(LocalSocketConnector::new());
        session.initialize(config_for(&socket)).await.unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            session.process(VerificationRequest::new(ScanEvidence::default())),
        )
        .await
        .expect("undecodable result left the request waiting");

        assert!(matches!(&outcome, Err(ClientError::Transport(m)) if m.contains("invalid engine response")));
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.state(), SessionState::Ready);
        session.dispose().await;
    }
}

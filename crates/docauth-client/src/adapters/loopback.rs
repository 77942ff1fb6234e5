//! In-process engine double.
//!
//! Speaks the engine side of the protocol over in-memory queues so sessions
//! can be driven without a real engine: handshakes are accepted, rejected,
//! ignored or refused, submitted requests are queued for the test to answer
//! in any order, notifications can be injected, and the link can be severed.
//! Resource counters make leaks observable.

use crate::ports::{EngineConnector, EngineLink, FrameSink, FrameSource, TransportError};
use async_trait::async_trait;
use docauth_types::{ClientFrame, EngineFrame, RequestId, VerificationRequest, VerificationResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// How the double answers a `Hello`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandshakeMode {
    /// Reply with `Welcome`.
    #[default]
    Accept,
    /// Reply with `Rejected { reason }`.
    Reject(String),
    /// Never reply.
    Silent,
    /// Refuse the connection outright.
    Refuse,
}

/// Scripted answer for [`LoopbackEngine::serve`].
#[derive(Debug, Clone)]
pub enum EngineReply {
    Complete(VerificationResult),
    Fail(String),
    /// Leave the request unanswered.
    Ignore,
}

struct Inner {
    engine_version: String,
    mode: Mutex<HandshakeMode>,
    next_link_id: AtomicU64,
    /// Engine → client queue of the current link.
    to_client: Mutex<Option<(u64, mpsc::UnboundedSender<EngineFrame>)>>,
    requests_tx: mpsc::UnboundedSender<VerificationRequest>,
    requests_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<VerificationRequest>>,
    hellos: Mutex<Vec<ClientFrame>>,
    cancels: Mutex<Vec<RequestId>>,
    connect_attempts: AtomicUsize,
    open_channels: AtomicUsize,
    close_calls: AtomicUsize,
    goodbyes: AtomicUsize,
}

impl Inner {
    fn send_to_client(&self, frame: EngineFrame) -> bool {
        let guard = self.to_client.lock();
        match guard.as_ref() {
            Some((_, tx)) => tx.send(frame).is_ok(),
            None => {
                debug!(frame = frame.name(), "No client connected, frame dropped");
                false
            }
        }
    }
}

/// In-process engine double. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct LoopbackEngine {
    inner: Arc<Inner>,
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackEngine {
    /// An engine that accepts handshakes.
    pub fn new() -> Self {
        Self::with_mode(HandshakeMode::Accept)
    }

    pub fn with_mode(mode: HandshakeMode) -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                engine_version: "loopback-1.0".to_string(),
                mode: Mutex::new(mode),
                next_link_id: AtomicU64::new(1),
                to_client: Mutex::new(None),
                requests_tx,
                requests_rx: tokio::sync::Mutex::new(requests_rx),
                hellos: Mutex::new(Vec::new()),
                cancels: Mutex::new(Vec::new()),
                connect_attempts: AtomicUsize::new(0),
                open_channels: AtomicUsize::new(0),
                close_calls: AtomicUsize::new(0),
                goodbyes: AtomicUsize::new(0),
            }),
        }
    }

    /// Change the handshake behaviour for later connections.
    pub fn set_mode(&self, mode: HandshakeMode) {
        *self.inner.mode.lock() = mode;
    }

    pub fn engine_version(&self) -> &str {
        &self.inner.engine_version
    }

    // =========================================================================
    // ENGINE SIDE
    // =========================================================================

    /// Wait for the next submitted request.
    pub async fn next_request(&self) -> Option<VerificationRequest> {
        self.inner.requests_rx.lock().await.recv().await
    }

    /// Take a submitted request if one is queued.
    pub fn try_next_request(&self) -> Option<VerificationRequest> {
        self.inner.requests_rx.try_lock().ok()?.try_recv().ok()
    }

    /// Answer a request with a result.
    pub fn respond(&self, result: VerificationResult) -> bool {
        self.inner.send_to_client(EngineFrame::Completed { result })
    }

    /// Give up on a request.
    pub fn fail(&self, request_id: RequestId, message: impl Into<String>) -> bool {
        self.inner.send_to_client(EngineFrame::Failed {
            request_id,
            message: message.into(),
        })
    }

    pub fn emit_stage(&self, request_id: Option<RequestId>, stage: impl Into<String>) -> bool {
        self.inner.send_to_client(EngineFrame::Stage {
            request_id,
            stage: stage.into(),
        })
    }

    pub fn emit_error(&self, request_id: Option<RequestId>, text: impl Into<String>) -> bool {
        self.inner.send_to_client(EngineFrame::Error {
            request_id,
            text: text.into(),
        })
    }

    /// Drop the current link from the engine side.
    pub fn sever(&self) {
        if self.inner.to_client.lock().take().is_some() {
            debug!("Loopback engine severed the link");
        }
    }

    /// Answer every submitted request with `handler` until the engine is
    /// dropped or the task is aborted.
    pub fn serve<F>(&self, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(&VerificationRequest) -> EngineReply + Send + 'static,
    {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(request) = engine.next_request().await {
                match handler(&request) {
                    EngineReply::Complete(result) => {
                        engine.respond(result);
                    }
                    EngineReply::Fail(message) => {
                        engine.fail(request.id(), message);
                    }
                    EngineReply::Ignore => {}
                }
            }
        })
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    pub fn connect_attempts(&self) -> usize {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    /// Links whose client halves are still alive.
    pub fn open_channels(&self) -> usize {
        self.inner.open_channels.load(Ordering::SeqCst)
    }

    /// Times a client closed its sink.
    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    pub fn goodbyes(&self) -> usize {
        self.inner.goodbyes.load(Ordering::SeqCst)
    }

    /// Requests the client asked to cancel, in arrival order.
    pub fn cancels(&self) -> Vec<RequestId> {
        self.inner.cancels.lock().clone()
    }

    pub fn last_hello(&self) -> Option<ClientFrame> {
        self.inner.hellos.lock().last().cloned()
    }
}

#[async_trait]
impl EngineConnector for LoopbackEngine {
    async fn connect(&self, address: &str) -> Result<EngineLink, TransportError> {
        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if *self.inner.mode.lock() == HandshakeMode::Refuse {
            return Err(TransportError::Refused(format!(
                "loopback engine at {address} refuses connections"
            )));
        }

        let link_id = self.inner.next_link_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.to_client.lock() = Some((link_id, tx));

        self.inner.open_channels.fetch_add(1, Ordering::SeqCst);
        let guard = Arc::new(ChannelGuard {
            inner: self.inner.clone(),
        });
        debug!(address, link_id, "Loopback engine accepted a link");

        Ok(EngineLink::new(
            LoopbackSink {
                inner: self.inner.clone(),
                link_id,
                closed: false,
                _guard: guard.clone(),
            },
            LoopbackSource { rx, _guard: guard },
        ))
    }
}

/// Counts a link as open until both client halves are dropped.
struct ChannelGuard {
    inner: Arc<Inner>,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.inner.open_channels.fetch_sub(1, Ordering::SeqCst);
    }
}

struct LoopbackSink {
    inner: Arc<Inner>,
    link_id: u64,
    closed: bool,
    _guard: Arc<ChannelGuard>,
}

impl LoopbackSink {
    fn link_alive(&self) -> bool {
        matches!(&*self.inner.to_client.lock(), Some((id, _)) if *id == self.link_id)
    }
}

#[async_trait]
impl FrameSink for LoopbackSink {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        if self.closed || !self.link_alive() {
            return Err(TransportError::ChannelClosed);
        }

        match frame {
            ClientFrame::Hello { .. } => {
                self.inner.hellos.lock().push(frame);
                let mode = self.inner.mode.lock().clone();
                match mode {
                    HandshakeMode::Accept => {
                        self.inner.send_to_client(EngineFrame::Welcome {
                            protocol_version: docauth_types::PROTOCOL_VERSION,
                            engine_version: self.inner.engine_version.clone(),
                        });
                    }
                    HandshakeMode::Reject(reason) => {
                        self.inner.send_to_client(EngineFrame::Rejected { reason });
                    }
                    HandshakeMode::Silent | HandshakeMode::Refuse => {}
                }
            }
            ClientFrame::Process { request } => {
                self.inner
                    .requests_tx
                    .send(request)
                    .map_err(|_| TransportError::ChannelClosed)?;
            }
            ClientFrame::Cancel { request_id } => {
                self.inner.cancels.lock().push(request_id);
            }
            ClientFrame::Goodbye => {
                self.inner.goodbyes.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed = true;

        // The engine hangs up when the client closes.
        let mut to_client = self.inner.to_client.lock();
        if matches!(&*to_client, Some((id, _)) if *id == self.link_id) {
            *to_client = None;
        }
        Ok(())
    }
}

struct LoopbackSource {
    rx: mpsc::UnboundedReceiver<EngineFrame>,
    _guard: Arc<ChannelGuard>,
}

#[async_trait]
impl FrameSource for LoopbackSource {
    async fn recv(&mut self) -> Result<Option<EngineFrame>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

//! Authentication session - owns the engine channel for its whole life.
//!
//! One session holds at most one link. After the handshake the link is
//! split between two tasks:
//!
//! - the writer task owns the sink and drains an outbound queue, so frames
//!   from concurrent submitters are written whole and in queue order;
//! - the receive task owns the source and routes every engine frame:
//!   `Completed`/`Failed` to the correlation table, `Stage`/`Error` to the
//!   event bus.

use crate::domain::{
    ClientError, PendingExchangeStore, PendingStats, SessionConfig, SessionState,
};
use crate::exchange::PendingExchange;
use crate::ports::{EngineConnector, EngineLink, FrameSink, FrameSource, TransportError};
use docauth_bus::{
    EngineErrorReport, EngineEvent, EngineEventBus, EventFilter, EventStream, ListenerHandle,
    StageChanged, DEFAULT_CHANNEL_CAPACITY,
};
use docauth_telemetry::SESSIONS_OPEN;
use docauth_types::{
    ClientFrame, EngineFrame, RequestId, VerificationRequest, VerificationResult, PROTOCOL_VERSION,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// How long `dispose` waits for queued frames to reach the engine.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A frame queued for the writer task.
struct Outbound {
    frame: ClientFrame,
    ack: Option<oneshot::Sender<Result<(), TransportError>>>,
}

/// State shared between the session, its tasks and its exchanges.
pub(crate) struct SessionShared {
    state: RwLock<SessionState>,
    pub(crate) pending: PendingExchangeStore,
    bus: EngineEventBus,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    default_deadline: RwLock<Option<Duration>>,
    engine_version: RwLock<Option<String>>,
}

impl SessionShared {
    fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub(crate) fn default_deadline(&self) -> Option<Duration> {
        *self.default_deadline.read()
    }

    /// Queue a frame without waiting for it to be written.
    pub(crate) fn send_best_effort(&self, frame: ClientFrame) -> bool {
        let name = frame.name();
        let queued = match &*self.outbound.lock() {
            Some(tx) => tx.send(Outbound { frame, ack: None }).is_ok(),
            None => false,
        };
        if !queued {
            debug!(frame = name, "No engine link, frame not sent");
        }
        queued
    }

    /// Queue a frame and wait until the writer task has written it.
    async fn send(&self, frame: ClientFrame) -> Result<(), TransportError> {
        let tx = self
            .outbound
            .lock()
            .clone()
            .ok_or(TransportError::ChannelClosed)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(Outbound {
            frame,
            ack: Some(ack_tx),
        })
        .map_err(|_| TransportError::ChannelClosed)?;
        drop(tx);

        ack_rx.await.map_err(|_| TransportError::ChannelClosed)?
    }

    fn route(&self, frame: EngineFrame) {
        match frame {
            EngineFrame::Completed { result } => {
                self.pending.complete(result);
            }
            EngineFrame::Failed {
                request_id,
                message,
            } => {
                self.pending.fail(
                    request_id,
                    ClientError::EngineReported {
                        request_id,
                        message,
                    },
                );
            }
            frame @ (EngineFrame::Stage { .. } | EngineFrame::Error { .. }) => {
                if let Some(event) = EngineEvent::from_frame(&frame) {
                    self.bus.publish(event);
                }
            }
            frame => {
                warn!(frame = frame.name(), "Unexpected handshake frame after initialization");
            }
        }
    }

    /// The engine answered `request_id` with a body that did not decode.
    fn reject_response(&self, request_id: RequestId, reason: String) {
        warn!(request_id = %request_id, reason = %reason, "Undecodable engine response");
        self.pending.fail(
            request_id,
            ClientError::Transport(format!("invalid engine response: {reason}")),
        );
    }

    /// The link broke under a ready session.
    fn link_lost(&self, reason: String) {
        {
            let mut state = self.state.write();
            if *state != SessionState::Ready {
                return;
            }
            *state = SessionState::Failed;
        }

        error!(reason = %reason, "Engine link lost");
        self.outbound.lock().take();

        let failed = self
            .pending
            .fail_all(|_| ClientError::Transport(reason.clone()));
        if failed > 0 {
            warn!(count = failed, "Failed in-flight exchanges after link loss");
        }

        self.bus
            .publish(EngineEvent::error(None, format!("engine link lost: {reason}")));
    }
}

struct SessionTasks {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Client-side session with one document authentication engine.
///
/// ```text
/// Uninitialized ──initialize──► Initializing ──► Ready ──link lost──► Failed
///                                     │                                 │
///                                     └──────────► Failed               │
///                       dispose (from any of the above but Uninitialized)
///                                     ▼
///                                  Disposed
/// ```
///
/// Requests may be submitted concurrently from any number of tasks; each
/// gets back exactly the result the engine produced for it, whatever order
/// the engine answers in.
pub struct AuthenticationSession {
    connector: Arc<dyn EngineConnector>,
    shared: Arc<SessionShared>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Option<SessionTasks>>,
    channel_open: AtomicBool,
}

impl AuthenticationSession {
    /// Create an uninitialized session that will connect through `connector`.
    pub fn new<C>(connector: C) -> Self
    where
        C: EngineConnector + 'static,
    {
        Self::with_event_capacity(connector, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Like [`new`](Self::new) with a custom event buffer per subscriber.
    pub fn with_event_capacity<C>(connector: C, event_capacity: usize) -> Self
    where
        C: EngineConnector + 'static,
    {
        let (shutdown, _) = watch::channel(false);
        Self {
            connector: Arc::new(connector),
            shared: Arc::new(SessionShared {
                state: RwLock::new(SessionState::Uninitialized),
                pending: PendingExchangeStore::new(),
                bus: EngineEventBus::with_capacity(event_capacity),
                outbound: Mutex::new(None),
                default_deadline: RwLock::new(None),
                engine_version: RwLock::new(None),
            }),
            shutdown,
            tasks: Mutex::new(None),
            channel_open: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Version string the engine announced in its handshake.
    pub fn engine_version(&self) -> Option<String> {
        self.shared.engine_version.read().clone()
    }

    /// Number of exchanges still waiting for the engine.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.pending_count()
    }

    pub fn pending_stats(&self) -> &PendingStats {
        self.shared.pending.stats()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Connect to the engine and perform the handshake.
    ///
    /// Invalid configuration is rejected before anything changes. Every other
    /// failure releases whatever was opened, leaves the session `Failed` and
    /// returns [`ClientError::Connection`].
    pub async fn initialize(&self, config: SessionConfig) -> Result<(), ClientError> {
        config.validate()?;

        {
            let mut state = self.shared.state.write();
            match *state {
                SessionState::Uninitialized => *state = SessionState::Initializing,
                SessionState::Disposed => return Err(ClientError::Disposed),
                _ => return Err(ClientError::AlreadyInitialized),
            }
        }

        let address = config.channel_address().to_string();
        info!(
            channel = %address,
            logging_directory = %config.logging_directory.display(),
            host_data_directory = %config.host_data_directory.display(),
            "Initializing authentication session"
        );

        let deadline = Instant::now() + config.connect_timeout;
        let mut shutdown = self.shutdown.subscribe();

        let connected = tokio::select! {
            biased;
            _ = shutdown.changed() => Err(ClientError::Disposed),
            connected = tokio::time::timeout_at(deadline, self.connector.connect(&address)) => {
                match connected {
                    Ok(Ok(link)) => Ok(link),
                    Ok(Err(e)) => Err(ClientError::Connection(e.to_string())),
                    Err(_) => Err(ClientError::Connection(format!(
                        "no engine connection within {:?}",
                        config.connect_timeout
                    ))),
                }
            }
        };
        let mut link = match connected {
            Ok(link) => link,
            Err(e) => return Err(self.fail_initialization(e)),
        };

        let handshake = tokio::select! {
            biased;
            _ = shutdown.changed() => Err(ClientError::Disposed),
            outcome = tokio::time::timeout_at(deadline, handshake(&mut link, &config, &self.shared)) => {
                outcome.unwrap_or_else(|_| {
                    Err(ClientError::Connection(format!(
                        "engine did not answer the handshake within {:?}",
                        config.connect_timeout
                    )))
                })
            }
        };
        let engine_version = match handshake {
            Ok(version) => version,
            Err(e) => {
                close_link(&mut link).await;
                return Err(self.fail_initialization(e));
            }
        };

        let EngineLink { mut sink, source } = link;
        {
            let mut state = self.shared.state.write();
            if *state == SessionState::Initializing {
                let (tx, rx) = mpsc::unbounded_channel();
                *self.shared.outbound.lock() = Some(tx);
                *self.shared.default_deadline.write() = config.default_deadline;
                *self.shared.engine_version.write() = Some(engine_version.clone());

                let writer = tokio::spawn(run_writer(sink, rx));
                let reader = tokio::spawn(run_reader(
                    self.shared.clone(),
                    source,
                    self.shutdown.subscribe(),
                ));
                *self.tasks.lock() = Some(SessionTasks { reader, writer });
                *state = SessionState::Ready;

                self.channel_open.store(true, Ordering::SeqCst);
                SESSIONS_OPEN.inc();
                info!(engine_version = %engine_version, "Authentication session ready");
                return Ok(());
            }
        }

        // Disposed while the handshake was finishing.
        if let Err(e) = sink.close().await {
            debug!(error = %e, "Closing link after concurrent dispose failed");
        }
        Err(ClientError::Disposed)
    }

    fn fail_initialization(&self, error: ClientError) -> ClientError {
        let mut state = self.shared.state.write();
        if *state == SessionState::Initializing {
            *state = SessionState::Failed;
            error!(error = %error, "Session initialization failed");
            error
        } else {
            ClientError::Disposed
        }
    }

    /// Shut the session down and release the channel.
    ///
    /// Safe to call any number of times, from any state; a session that
    /// never initialized has nothing to release. In-flight exchanges fail
    /// with [`ClientError::Disposed`].
    pub async fn dispose(&self) {
        let previous = {
            let mut state = self.shared.state.write();
            match *state {
                SessionState::Uninitialized | SessionState::Disposed => return,
                previous => {
                    *state = SessionState::Disposed;
                    previous
                }
            }
        };
        info!(from = %previous, "Disposing authentication session");

        self.shutdown.send_replace(true);

        if let Some(tx) = self.shared.outbound.lock().take() {
            let _ = tx.send(Outbound {
                frame: ClientFrame::Goodbye,
                ack: None,
            });
        }

        let tasks = self.tasks.lock().take();
        if let Some(SessionTasks { reader, mut writer }) = tasks {
            if let Err(e) = reader.await {
                warn!(error = %e, "Receive task ended abnormally");
            }
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut writer).await.is_err() {
                warn!("Writer task did not drain in time, aborting");
                writer.abort();
            }
        }

        let failed = self.shared.pending.fail_all(|_| ClientError::Disposed);
        if failed > 0 {
            info!(count = failed, "Failed in-flight exchanges on dispose");
        }
        self.shared.bus.close();

        if self.channel_open.swap(false, Ordering::SeqCst) {
            SESSIONS_OPEN.dec();
        }
        info!("Authentication session disposed");
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Register callbacks for engine notifications.
    ///
    /// Allowed in any state; callbacks run on their own task until the
    /// handle is cancelled or the session is disposed.
    pub fn subscribe<S, E>(&self, on_stage: S, on_error: E) -> ListenerHandle
    where
        S: Fn(&StageChanged) + Send + 'static,
        E: Fn(&EngineErrorReport) + Send + 'static,
    {
        self.shared.bus.listen(on_stage, on_error)
    }

    /// Engine notifications as a stream.
    pub fn events(&self, filter: EventFilter) -> EventStream {
        self.shared.bus.event_stream(filter)
    }

    // =========================================================================
    // EXCHANGE
    // =========================================================================

    /// Send a request to the engine without waiting for its result.
    ///
    /// Returns once the request frame has been written.
    pub async fn submit(&self, request: VerificationRequest) -> Result<PendingExchange, ClientError> {
        match self.state() {
            SessionState::Ready => {}
            SessionState::Disposed => return Err(ClientError::Disposed),
            state => return Err(ClientError::NotReady { state }),
        }

        let request_id = request.id();
        let rx = self.shared.pending.register(request_id)?;
        let exchange = PendingExchange::new(request_id, rx, self.shared.clone());

        debug!(
            request_id = %request_id,
            images = request.evidence().images().len(),
            crop = request.options().crop_required,
            "Submitting verification request"
        );

        if let Err(e) = self.shared.send(ClientFrame::Process { request }).await {
            let error = ClientError::Transport(e.to_string());
            self.shared.pending.fail(request_id, error.clone());
            return Err(error);
        }
        Ok(exchange)
    }

    /// Submit a request and wait for its result, bounded by the configured
    /// default deadline if there is one.
    pub async fn process(&self, request: VerificationRequest) -> Result<VerificationResult, ClientError> {
        self.submit(request).await?.wait().await
    }

    pub async fn process_with_deadline(
        &self,
        request: VerificationRequest,
        deadline: Duration,
    ) -> Result<VerificationResult, ClientError> {
        self.submit(request).await?.wait_with_deadline(deadline).await
    }
}

impl Drop for AuthenticationSession {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        if let Some(tasks) = self.tasks.get_mut().take() {
            tasks.reader.abort();
            tasks.writer.abort();
        }
        self.shared.outbound.lock().take();

        {
            let mut state = self.shared.state.write();
            if state.holds_resources() {
                warn!(state = %*state, "Session dropped without dispose");
            }
            *state = SessionState::Disposed;
        }

        self.shared.pending.fail_all(|_| ClientError::Disposed);
        self.shared.bus.close();
        if self.channel_open.swap(false, Ordering::SeqCst) {
            SESSIONS_OPEN.dec();
        }
    }
}

/// Send `Hello` and wait for the engine's verdict.
///
/// Notifications that arrive before the verdict are published.
async fn handshake(
    link: &mut EngineLink,
    config: &SessionConfig,
    shared: &SessionShared,
) -> Result<String, ClientError> {
    let hello = ClientFrame::Hello {
        protocol_version: PROTOCOL_VERSION,
        client: format!("docauth-client/{}", env!("CARGO_PKG_VERSION")),
        logging_directory: config.logging_directory.clone(),
        host_data_directory: config.host_data_directory.clone(),
    };
    link.sink
        .send(hello)
        .await
        .map_err(|e| ClientError::Connection(format!("failed to send hello: {e}")))?;

    loop {
        match link.source.recv().await {
            Ok(Some(EngineFrame::Welcome {
                protocol_version,
                engine_version,
            })) => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(ClientError::Connection(format!(
                        "engine speaks protocol {protocol_version}, client speaks {PROTOCOL_VERSION}"
                    )));
                }
                return Ok(engine_version);
            }
            Ok(Some(EngineFrame::Rejected { reason })) => {
                return Err(ClientError::Connection(format!(
                    "engine rejected the session: {reason}"
                )));
            }
            Ok(Some(frame)) => match EngineEvent::from_frame(&frame) {
                Some(event) => {
                    shared.bus.publish(event);
                }
                None => warn!(frame = frame.name(), "Unexpected frame during handshake"),
            },
            Ok(None) => {
                return Err(ClientError::Connection(
                    "engine closed the channel during handshake".to_string(),
                ));
            }
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Dropping undecodable frame during handshake");
            }
            Err(e) => return Err(ClientError::Connection(e.to_string())),
        }
    }
}

async fn close_link(link: &mut EngineLink) {
    if let Err(e) = link.sink.close().await {
        debug!(error = %e, "Closing engine link failed");
    }
}

async fn run_writer(mut sink: Box<dyn FrameSink>, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(Outbound { frame, ack }) = rx.recv().await {
        let name = frame.name();
        let result = sink.send(frame).await;

        let fatal = match &result {
            Ok(()) => false,
            Err(e) => {
                warn!(frame = name, error = %e, "Failed to write frame");
                e.is_fatal()
            }
        };
        if let Some(ack) = ack {
            let _ = ack.send(result);
        }
        if fatal {
            break;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "Closing engine sink failed");
    }
    debug!("Writer task stopped");
}

async fn run_reader(
    shared: Arc<SessionShared>,
    mut source: Box<dyn FrameSource>,
    mut shutdown: watch::Receiver<bool>,
) {
    if *shutdown.borrow_and_update() {
        return;
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!("Receive task stopping");
                return;
            }
            next = source.recv() => next,
        };

        match next {
            Ok(Some(frame)) => shared.route(frame),
            Err(TransportError::InvalidResponse { request_id, reason }) => {
                shared.reject_response(request_id, reason);
            }
            Ok(None) => {
                shared.link_lost("engine closed the channel".to_string());
                return;
            }
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Dropping undecodable frame");
            }
            Err(e) => {
                shared.link_lost(e.to_string());
                return;
            }
        }
    }
}

// Test code may use unwrap/expect freely.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! # docauth-client
//!
//! Client side of the document authentication engine: one session per
//! engine, any number of concurrent verification requests over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       AuthenticationSession                          │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │   submit / process                subscribe / events                 │
//! │         │                                 ▲                          │
//! │  ┌──────┴───────────────┐       ┌─────────┴──────────┐               │
//! │  │ Pending Exchange     │       │  EngineEventBus    │               │
//! │  │ Store (id → waiter)  │       │  (stage / error)   │               │
//! │  └──────┬───────────▲───┘       └─────────▲──────────┘               │
//! │         │           │ Completed/Failed    │ Stage/Error              │
//! │  ┌──────┴──────┐  ┌─┴──────────────────────┴─┐                       │
//! │  │ writer task │  │       receive task        │                       │
//! │  └──────┬──────┘  └────────────▲──────────────┘                       │
//! └─────────┼──────────────────────┼─────────────────────────────────────┘
//!           ▼   FrameSink          │ FrameSource
//!       ┌───────────────────────────────┐
//!       │  EngineConnector (port)       │  LocalSocketConnector | LoopbackEngine
//!       └───────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Each request resolves exactly once: with its own result, or with a
//!   [`ClientError`]. An error never carries a result.
//! - Results are matched by request id, so the engine may answer in any
//!   order.
//! - Stage and error notifications are delivered on the event bus with no
//!   ordering guarantee relative to results. An error event about a request
//!   may arrive before or after that request's failure; both are delivered.
//! - A completion the engine sends but that does not decode fails its
//!   request with [`ClientError::Transport`] instead of leaving it waiting.
//! - `dispose` is idempotent and releases the channel exactly once.
//!
//! ## Usage
//!
//! ```ignore
//! use docauth_client::{AuthenticationSession, LocalSocketConnector, SessionConfig};
//!
//! let session = AuthenticationSession::new(LocalSocketConnector::new());
//! session.initialize(SessionConfig::from_env()?).await?;
//! let result = session.process(request).await?;
//! session.dispose().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod exchange;
pub mod ports;
pub mod service;

pub use adapters::{EngineReply, HandshakeMode, LocalSocketConnector, LoopbackEngine};
pub use domain::{
    ClientError, ConfigError, ExchangeOutcome, PendingExchangeStore, PendingStats, SessionConfig,
    SessionState, DEFAULT_CHANNEL_NAME,
};
pub use exchange::{ExchangeCanceller, PendingExchange};
pub use ports::{EngineConnector, EngineLink, FrameSink, FrameSource, TransportError};
pub use service::AuthenticationSession;

pub use docauth_bus::{EngineErrorReport, EngineEvent, EventFilter, EventKind, ListenerHandle, StageChanged};

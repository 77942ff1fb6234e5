//! Outbound ports for the engine channel.
//!
//! A connector opens a link; the link splits into a sink the session
//! writes to and a source its receive task reads from. The session owns
//! both halves exclusively, so implementations need not be safe for
//! concurrent use of one half.

use async_trait::async_trait;
use docauth_types::{ClientFrame, EngineFrame, RequestId};
use std::io;
use thiserror::Error;

/// Transport error types
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("channel closed")]
    ChannelClosed,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(String),
    /// A completion frame named a request but its body did not decode.
    #[error("invalid response for request {request_id}: {reason}")]
    InvalidResponse { request_id: RequestId, reason: String },
    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },
    #[error("connection refused: {0}")]
    Refused(String),
}

impl TransportError {
    /// Whether the channel is unusable after this error.
    ///
    /// A frame that fails to decode leaves framing intact, so the next
    /// frame can still be read.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TransportError::Codec(_) | TransportError::InvalidResponse { .. }
        )
    }
}

/// Writes frames to the engine.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one frame.
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError>;

    /// Close the channel's write side. Called at most once by the session.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Reads frames from the engine.
#[async_trait]
pub trait FrameSource: Send {
    /// Receive the next frame; `Ok(None)` when the engine closed the channel.
    async fn recv(&mut self) -> Result<Option<EngineFrame>, TransportError>;
}

/// An open channel to the engine.
pub struct EngineLink {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

impl EngineLink {
    pub fn new(sink: impl FrameSink + 'static, source: impl FrameSource + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            source: Box::new(source),
        }
    }
}

/// Opens channels to an engine.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    /// Connect to the engine listening at `address`.
    async fn connect(&self, address: &str) -> Result<EngineLink, TransportError>;
}

//! Ports: what the session needs from an engine transport.

pub mod outbound;

pub use outbound::{EngineConnector, EngineLink, FrameSink, FrameSource, TransportError};

//! Adapters: concrete engine transports.
//!
//! - `local_socket`: Unix domain socket / Windows named pipe, the transport
//!   a real engine listens on
//! - `loopback`: in-process engine double for tests and demos
//! - `framing`: the length-prefixed JSON codec the socket transport uses

pub mod framing;
pub mod local_socket;
pub mod loopback;

pub use framing::{read_engine_frame, read_frame, write_frame, MAX_FRAME_SIZE};
pub use local_socket::{resolve_address, LocalSocketConnector, StreamSink, StreamSource};
pub use loopback::{EngineReply, HandshakeMode, LoopbackEngine};

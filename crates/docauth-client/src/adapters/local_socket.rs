//! Local-socket transport: Unix domain sockets, or named pipes on Windows.

use crate::adapters::framing::{read_engine_frame, write_frame};
use crate::ports::{EngineConnector, EngineLink, FrameSink, FrameSource, TransportError};
use async_trait::async_trait;
use docauth_types::{ClientFrame, EngineFrame};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Connects to an engine over the platform's local IPC mechanism.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSocketConnector;

impl LocalSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Map a channel address to the platform endpoint.
///
/// Paths and full pipe names are used as given. A bare name becomes
/// `<tmp>/<name>.sock` on Unix and `\\.\pipe\<name>` on Windows.
#[cfg(unix)]
pub fn resolve_address(address: &str) -> String {
    if address.contains('/') {
        address.to_string()
    } else {
        std::env::temp_dir()
            .join(format!("{address}.sock"))
            .to_string_lossy()
            .into_owned()
    }
}

#[cfg(windows)]
pub fn resolve_address(address: &str) -> String {
    const PIPE_PREFIX: &str = r"\\.\pipe\";
    if address.starts_with(PIPE_PREFIX) {
        address.to_string()
    } else {
        format!("{PIPE_PREFIX}{address}")
    }
}

fn connect_error(endpoint: &str, e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => {
            TransportError::Refused(format!("{endpoint}: {e}"))
        }
        _ => TransportError::Io(e),
    }
}

#[async_trait]
impl EngineConnector for LocalSocketConnector {
    #[cfg(unix)]
    async fn connect(&self, address: &str) -> Result<EngineLink, TransportError> {
        let endpoint = resolve_address(address);
        debug!(endpoint = %endpoint, "Connecting to engine socket");

        let stream = tokio::net::UnixStream::connect(&endpoint)
            .await
            .map_err(|e| connect_error(&endpoint, e))?;
        let (reader, writer) = stream.into_split();

        Ok(EngineLink::new(StreamSink::new(writer), StreamSource::new(reader)))
    }

    #[cfg(windows)]
    async fn connect(&self, address: &str) -> Result<EngineLink, TransportError> {
        use tokio::net::windows::named_pipe::ClientOptions;

        let endpoint = resolve_address(address);
        debug!(endpoint = %endpoint, "Connecting to engine pipe");

        let pipe = ClientOptions::new()
            .open(&endpoint)
            .map_err(|e| connect_error(&endpoint, e))?;
        let (reader, writer) = tokio::io::split(pipe);

        Ok(EngineLink::new(StreamSink::new(writer), StreamSource::new(reader)))
    }
}

/// Frame sink over the write half of a byte stream.
pub struct StreamSink<W> {
    writer: W,
}

impl<W> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> FrameSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        write_frame(&mut self.writer, &frame).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Frame source over the read half of a byte stream.
pub struct StreamSource<R> {
    reader: R,
}

impl<R> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> FrameSource for StreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<EngineFrame>, TransportError> {
        read_engine_frame(&mut self.reader).await
    }
}

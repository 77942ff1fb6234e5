//! Client error taxonomy.
//!
//! Every variant means the caller got no [`VerificationResult`]. A document
//! that genuinely failed its checks is not an error: it arrives as a result
//! whose status is [`VerificationStatus::Failed`].
//!
//! [`VerificationResult`]: docauth_types::VerificationResult
//! [`VerificationStatus::Failed`]: docauth_types::VerificationStatus::Failed

use crate::domain::config::ConfigError;
use crate::domain::state::SessionState;
use docauth_telemetry::metrics::outcome;
use docauth_types::RequestId;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Could not reach or handshake with the engine.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The channel broke while a request was in flight.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request {request_id} timed out after {after:?}")]
    Timeout {
        request_id: RequestId,
        after: Duration,
    },

    #[error("request {request_id} cancelled")]
    Cancelled { request_id: RequestId },

    /// The engine gave up on the request without a result.
    #[error("engine failed request {request_id}: {message}")]
    EngineReported {
        request_id: RequestId,
        message: String,
    },

    #[error("session already initialized")]
    AlreadyInitialized,

    #[error("session not ready (state: {state})")]
    NotReady { state: SessionState },

    #[error("request {0} is already in flight")]
    DuplicateRequest(RequestId),

    #[error("session disposed")]
    Disposed,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Always true: a failed call never carries a result.
    ///
    /// Exists so report code can state the distinction explicitly instead of
    /// folding errors into a "failed" status.
    pub fn is_absent_result(&self) -> bool {
        true
    }

    /// Request the error is about, when it is about one.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ClientError::Timeout { request_id, .. }
            | ClientError::Cancelled { request_id }
            | ClientError::EngineReported { request_id, .. } => Some(*request_id),
            ClientError::DuplicateRequest(id) => Some(*id),
            _ => None,
        }
    }

    /// Exchange outcome label for metrics.
    pub(crate) fn outcome_label(&self) -> &'static str {
        match self {
            ClientError::Timeout { .. } => outcome::TIMEOUT,
            ClientError::Cancelled { .. } => outcome::CANCELLED,
            ClientError::EngineReported { .. } => outcome::ENGINE_FAILED,
            ClientError::Disposed => outcome::DISPOSED,
            _ => outcome::TRANSPORT,
        }
    }
}

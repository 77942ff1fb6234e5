//! # IPC Frames
//!
//! Payloads carried over the local channel between the client and the
//! authentication engine.
//!
//! ## Design Rules
//!
//! - Every frame is a JSON object tagged by `type`.
//! - Request/response pairs are correlated by the request's [`RequestId`];
//!   completion frames carry the id, nothing else routes them.
//! - `Stage` and `Error` frames are notifications. They never complete an
//!   exchange, even when they name a request.

use crate::request::{RequestId, VerificationRequest};
use crate::result::VerificationResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current protocol version spoken by this client.
pub const PROTOCOL_VERSION: u16 = 1;

// =============================================================================
// CLIENT → ENGINE
// =============================================================================

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// First frame on a new channel.
    Hello {
        protocol_version: u16,
        /// Free-form client identification for engine logs.
        client: String,
        logging_directory: PathBuf,
        host_data_directory: PathBuf,
    },

    /// Submit one request.
    Process { request: VerificationRequest },

    /// Best-effort abandonment of an in-flight request.
    Cancel { request_id: RequestId },

    /// Client is closing the channel.
    Goodbye,
}

impl ClientFrame {
    /// Short frame name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClientFrame::Hello { .. } => "hello",
            ClientFrame::Process { .. } => "process",
            ClientFrame::Cancel { .. } => "cancel",
            ClientFrame::Goodbye => "goodbye",
        }
    }
}

// =============================================================================
// ENGINE → CLIENT
// =============================================================================

/// Frames sent by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineFrame {
    /// Handshake accepted.
    Welcome {
        protocol_version: u16,
        engine_version: String,
    },

    /// Handshake refused.
    Rejected { reason: String },

    /// The engine produced a result for a request.
    Completed { result: VerificationResult },

    /// The engine gave up on a request without producing a result.
    Failed {
        request_id: RequestId,
        message: String,
    },

    /// Processing stage notification.
    Stage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        stage: String,
    },

    /// Error notification, general or about one request.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        text: String,
    },
}

impl EngineFrame {
    /// Short frame name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            EngineFrame::Welcome { .. } => "welcome",
            EngineFrame::Rejected { .. } => "rejected",
            EngineFrame::Completed { .. } => "completed",
            EngineFrame::Failed { .. } => "failed",
            EngineFrame::Stage { .. } => "stage",
            EngineFrame::Error { .. } => "error",
        }
    }

    /// Id of the request this frame completes, if it completes one.
    pub fn completes(&self) -> Option<RequestId> {
        match self {
            EngineFrame::Completed { result } => Some(result.request_id),
            EngineFrame::Failed { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    /// Request a raw `completed` or `failed` frame answers, read from a body
    /// that did not decode as an [`EngineFrame`].
    ///
    /// Lets the receiver fail that request instead of leaving it waiting.
    pub fn answered_request(raw: &serde_json::Value) -> Option<RequestId> {
        let id = match raw.get("type")?.as_str()? {
            "completed" => raw.get("result")?.get("request_id")?,
            "failed" => raw.get("request_id")?,
            _ => return None,
        };
        serde_json::from_value(id.clone()).ok()
    }
}

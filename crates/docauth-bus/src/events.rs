//! # Engine Events
//!
//! Notifications the engine emits while it works. They are informational:
//! nothing on this path completes or fails an exchange.

use docauth_types::{EngineFrame, RequestId};
use serde::{Deserialize, Serialize};

/// Processing stage notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageChanged {
    /// Request the stage belongs to, when the engine names one.
    pub request_id: Option<RequestId>,
    pub stage: String,
}

/// Error notification, general or about one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineErrorReport {
    pub request_id: Option<RequestId>,
    pub text: String,
}

/// All events carried by an [`EngineEventBus`](crate::EngineEventBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    StageChanged(StageChanged),
    ErrorReported(EngineErrorReport),
}

/// Event kinds for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Stage,
    Error,
}

impl EventKind {
    /// Metric label for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Stage => "stage",
            EventKind::Error => "error",
        }
    }
}

impl EngineEvent {
    pub fn stage(request_id: Option<RequestId>, stage: impl Into<String>) -> Self {
        EngineEvent::StageChanged(StageChanged {
            request_id,
            stage: stage.into(),
        })
    }

    pub fn error(request_id: Option<RequestId>, text: impl Into<String>) -> Self {
        EngineEvent::ErrorReported(EngineErrorReport {
            request_id,
            text: text.into(),
        })
    }

    /// Map an engine notification frame to an event.
    ///
    /// Returns `None` for frames that are not notifications.
    pub fn from_frame(frame: &EngineFrame) -> Option<Self> {
        match frame {
            EngineFrame::Stage { request_id, stage } => Some(Self::stage(*request_id, stage)),
            EngineFrame::Error { request_id, text } => Some(Self::error(*request_id, text)),
            _ => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::StageChanged(_) => EventKind::Stage,
            EngineEvent::ErrorReported(_) => EventKind::Error,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            EngineEvent::StageChanged(e) => e.request_id,
            EngineEvent::ErrorReported(e) => e.request_id,
        }
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
    /// Only events naming this request. General events (no request id)
    /// are excluded when set.
    pub request_id: Option<RequestId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            kinds,
            request_id: None,
        }
    }

    /// Create a filter for events about one request.
    #[must_use]
    pub fn for_request(request_id: RequestId) -> Self {
        Self {
            kinds: Vec::new(),
            request_id: Some(request_id),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &EngineEvent) -> bool {
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.kind());

        let request_match = match self.request_id {
            None => true,
            Some(id) => event.request_id() == Some(id),
        };

        kind_match && request_match
    }
}

//! # Verification Request
//!
//! One verification attempt: a fresh [`RequestId`], the evidence it owns,
//! and the options the engine should honour. The request is consumed by the
//! exchange when submitted, so it cannot change after it leaves the caller.

use crate::evidence::ScanEvidence;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation identifier for one request/response cycle.
///
/// Generated as a random (v4) UUID at request construction and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new request id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Restricts the engine to one family of checks instead of running all
/// applicable ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TestTypeOverride {
    #[serde(rename = "UVMark")]
    UvMark,
    #[serde(rename = "IRMark")]
    IrMark,
    #[serde(rename = "PDF417")]
    Pdf417,
    #[serde(rename = "RFID")]
    Rfid,
    Face,
    AntiSpoofing,
}

/// Per-request engine options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Ask the engine to return cropped/annotated images.
    pub crop_required: bool,
    /// `None` runs every applicable check.
    pub test_type: Option<TestTypeOverride>,
}

/// A single verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    id: RequestId,
    evidence: ScanEvidence,
    #[serde(default)]
    options: RequestOptions,
}

impl VerificationRequest {
    /// Wrap `evidence` in a request with a fresh id and default options.
    pub fn new(evidence: ScanEvidence) -> Self {
        Self {
            id: RequestId::new(),
            evidence,
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_crop_required(mut self, crop_required: bool) -> Self {
        self.options.crop_required = crop_required;
        self
    }

    pub fn with_test_type(mut self, test_type: TestTypeOverride) -> Self {
        self.options.test_type = Some(test_type);
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn evidence(&self) -> &ScanEvidence {
        &self.evidence
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Take the evidence back out, discarding the request.
    pub fn into_evidence(self) -> ScanEvidence {
        self.evidence
    }
}

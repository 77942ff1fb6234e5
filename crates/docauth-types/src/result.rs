//! # Verification Result
//!
//! The engine's answer to one request. A result only exists when the engine
//! actually produced one; transport failures, timeouts and cancellations
//! surface as errors from the exchange and never as a result with a
//! failed status.
//!
//! ## Invariants
//!
//! - Every [`Confidence`] lies in `[0.0, 1.0]`.
//! - A [`CrossMatch`] never compares a source with itself.
//!
//! Both are checked by the constructors and on deserialization, so a value
//! received from the engine is held to the same rules as one built locally.

use crate::errors::ModelError;
use crate::evidence::{ImageSlot, RawSource};
use crate::fields::DocumentFields;
use crate::grouping::{group_outcomes, OutcomeGroup};
use crate::request::RequestId;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use std::collections::BTreeMap;
use std::fmt;

/// Overall verdict for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    Passed,
    Failed,
    Indeterminate,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationStatus::Passed => "Passed",
            VerificationStatus::Failed => "Failed",
            VerificationStatus::Indeterminate => "Indeterminate",
        };
        f.write_str(s)
    }
}

/// Verdict of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
    Warning,
    Skipped,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Passed => "Passed",
            TestStatus::Failed => "Failed",
            TestStatus::Warning => "Warning",
            TestStatus::Skipped => "Skipped",
        };
        f.write_str(s)
    }
}

/// Family of related checks. Declaration order is the presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TestGroup {
    Document,
    Barcode,
    Biometric,
    #[serde(rename = "RFID")]
    Rfid,
    AntiSpoofing,
    /// Any group this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TestGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestGroup::Document => "Document",
            TestGroup::Barcode => "Barcode",
            TestGroup::Biometric => "Biometric",
            TestGroup::Rfid => "RFID",
            TestGroup::AntiSpoofing => "AntiSpoofing",
            TestGroup::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Category of an individual check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckKind {
    Visual,
    Ultraviolet,
    Infrared,
    DataIntegrity,
    CrossMatch,
    FaceComparison,
    Liveness,
    ChipAuthentication,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A score in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const FULL: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Result<Self, ModelError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ModelError::ConfidenceOutOfRange(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The evidence a compared value was derived from.
///
/// Raw sources and image slots have disjoint wire names, so the value travels
/// as a bare string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceSource {
    Raw(RawSource),
    Image(ImageSlot),
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceSource::Raw(source) => source.fmt(f),
            EvidenceSource::Image(slot) => slot.fmt(f),
        }
    }
}

impl From<RawSource> for EvidenceSource {
    fn from(source: RawSource) -> Self {
        EvidenceSource::Raw(source)
    }
}

impl From<ImageSlot> for EvidenceSource {
    fn from(slot: ImageSlot) -> Self {
        EvidenceSource::Image(slot)
    }
}

/// One side of a cross-match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub source: EvidenceSource,
    pub value: String,
}

impl FieldValue {
    pub fn new(source: impl Into<EvidenceSource>, value: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            value: value.into(),
        }
    }
}

/// Pairwise comparison of one logical field read from two different sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CrossMatchRecord")]
pub struct CrossMatch {
    field_name: String,
    first: FieldValue,
    second: FieldValue,
    confidence: Confidence,
}

/// Unchecked wire shape of [`CrossMatch`].
#[derive(Deserialize)]
struct CrossMatchRecord {
    field_name: String,
    first: FieldValue,
    second: FieldValue,
    confidence: Confidence,
}

impl TryFrom<CrossMatchRecord> for CrossMatch {
    type Error = ModelError;

    fn try_from(r: CrossMatchRecord) -> Result<Self, Self::Error> {
        CrossMatch::new(r.field_name, r.first, r.second, r.confidence)
    }
}

impl CrossMatch {
    /// Build a cross-match; fails when both values come from the same source.
    pub fn new(
        field_name: impl Into<String>,
        first: FieldValue,
        second: FieldValue,
        confidence: Confidence,
    ) -> Result<Self, ModelError> {
        let field_name = field_name.into();
        if first.source == second.source {
            return Err(ModelError::SelfCrossMatch { field: field_name });
        }
        Ok(Self {
            field_name,
            first,
            second,
            confidence,
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn first(&self) -> &FieldValue {
        &self.first
    }

    pub fn second(&self) -> &FieldValue {
        &self.second
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// True when both sources carried the same text.
    pub fn values_agree(&self) -> bool {
        self.first.value == self.second.value
    }
}

/// One individual check performed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub group: TestGroup,
    pub status: TestStatus,
    pub confidence: Confidence,
    pub kind: CheckKind,
    /// Present only for checks that compare two evidence sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_matches: Option<Vec<CrossMatch>>,
}

/// The engine's answer to one request.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub request_id: RequestId,
    pub overall_status: VerificationStatus,
    #[serde(default)]
    pub test_outcomes: Vec<TestOutcome>,
    #[serde(default)]
    pub document_fields: DocumentFields,
    #[serde(default)]
    pub plain_document_fields: DocumentFields,
    /// Cropped or annotated images; empty unless cropping was requested.
    #[serde_as(as = "BTreeMap<_, Base64>")]
    #[serde(default)]
    pub processed_images: BTreeMap<ImageSlot, Vec<u8>>,
}

impl VerificationResult {
    /// Empty result with the given verdict; mostly useful for engine doubles.
    pub fn new(request_id: RequestId, overall_status: VerificationStatus) -> Self {
        Self {
            request_id,
            overall_status,
            test_outcomes: Vec::new(),
            document_fields: DocumentFields::default(),
            plain_document_fields: DocumentFields::default(),
            processed_images: BTreeMap::new(),
        }
    }

    /// Outcomes grouped for presentation. See [`group_outcomes`].
    pub fn grouped(&self) -> Vec<OutcomeGroup<'_>> {
        group_outcomes(&self.test_outcomes)
    }

    pub fn processed_slots(&self) -> impl Iterator<Item = ImageSlot> + '_ {
        self.processed_images.keys().copied()
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &TestOutcome> {
        self.test_outcomes
            .iter()
            .filter(|o| o.status == TestStatus::Failed)
    }

    pub fn is_passed(&self) -> bool {
        self.overall_status == VerificationStatus::Passed
    }
}

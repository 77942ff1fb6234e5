//! # DocAuth Types Crate
//!
//! Value types shared by every layer of the document authentication client.
//!
//! ## Contents
//!
//! - **Evidence**: [`ScanEvidence`] and its builder, keyed by [`ImageSlot`] and [`RawSource`].
//! - **Request**: [`VerificationRequest`], the one-shot envelope around owned evidence.
//! - **Result**: [`VerificationResult`], [`TestOutcome`], [`CrossMatch`] and the
//!   presentation grouping in [`grouping`].
//! - **Fields**: [`DocumentFields`], the closed document schema with an unknown bucket.
//! - **IPC**: [`ClientFrame`] / [`EngineFrame`], the payloads exchanged with the engine.
//!
//! ## Design Principles
//!
//! - Payload contents (image formats, barcode syntax) are never validated here;
//!   that belongs to the engine.
//! - Invariants that the model does own (confidence range, cross-match sources)
//!   are enforced at construction and again at deserialization.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod errors;
pub mod evidence;
pub mod fields;
pub mod grouping;
pub mod ipc;
pub mod request;
pub mod result;

pub use errors::ModelError;
pub use evidence::{ImageSlot, RawDatum, RawSource, ScanEvidence, ScanEvidenceBuilder};
pub use fields::{DocumentFields, DocumentKind, FieldData, FieldKey};
pub use grouping::{group_outcomes, OutcomeGroup};
pub use ipc::{ClientFrame, EngineFrame, PROTOCOL_VERSION};
pub use request::{RequestId, RequestOptions, TestTypeOverride, VerificationRequest};
pub use result::{
    CheckKind, Confidence, CrossMatch, EvidenceSource, FieldValue, TestGroup, TestOutcome,
    TestStatus, VerificationResult, VerificationStatus,
};

//! # Scan Evidence
//!
//! The raw multi-source capture of one physical document: keyed images
//! (visible, UV, IR, face photos) and keyed raw payloads (PDF417 text,
//! RFID chip dump).
//!
//! Evidence is built once through [`ScanEvidenceBuilder`] and is immutable
//! afterwards. Keys are unique; writing the same key twice keeps the last value.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use std::collections::BTreeMap;
use std::fmt;

/// Which capture an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ImageSlot {
    ColorFront,
    ColorBack,
    #[serde(rename = "UVFront")]
    UvFront,
    #[serde(rename = "UVBack")]
    UvBack,
    #[serde(rename = "IRFront")]
    IrFront,
    #[serde(rename = "IRBack")]
    IrBack,
    CameraFace,
    RfidFace,
}

impl ImageSlot {
    /// Every slot, in declaration order.
    pub const ALL: [ImageSlot; 8] = [
        ImageSlot::ColorFront,
        ImageSlot::ColorBack,
        ImageSlot::UvFront,
        ImageSlot::UvBack,
        ImageSlot::IrFront,
        ImageSlot::IrBack,
        ImageSlot::CameraFace,
        ImageSlot::RfidFace,
    ];

    /// Wire name of the slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSlot::ColorFront => "ColorFront",
            ImageSlot::ColorBack => "ColorBack",
            ImageSlot::UvFront => "UVFront",
            ImageSlot::UvBack => "UVBack",
            ImageSlot::IrFront => "IRFront",
            ImageSlot::IrBack => "IRBack",
            ImageSlot::CameraFace => "CameraFace",
            ImageSlot::RfidFace => "RfidFace",
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a raw (non-image) payload was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RawSource {
    #[serde(rename = "PDF417")]
    Pdf417,
    #[serde(rename = "RFID")]
    Rfid,
}

impl RawSource {
    /// Wire name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            RawSource::Pdf417 => "PDF417",
            RawSource::Rfid => "RFID",
        }
    }
}

impl fmt::Display for RawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw payload as text (barcode string, serialized chip data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDatum {
    pub text: String,
}

impl RawDatum {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Multi-source evidence for one document.
///
/// An empty evidence set is valid; the engine will answer it with a
/// degenerate result rather than this layer rejecting it.
#[serde_as]
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvidence {
    #[serde_as(as = "BTreeMap<_, Base64>")]
    images: BTreeMap<ImageSlot, Vec<u8>>,
    raw_items: BTreeMap<RawSource, RawDatum>,
}

impl ScanEvidence {
    /// Start building evidence.
    pub fn builder() -> ScanEvidenceBuilder {
        ScanEvidenceBuilder::default()
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&[u8]> {
        self.images.get(&slot).map(Vec::as_slice)
    }

    pub fn raw(&self, source: RawSource) -> Option<&RawDatum> {
        self.raw_items.get(&source)
    }

    pub fn images(&self) -> &BTreeMap<ImageSlot, Vec<u8>> {
        &self.images
    }

    pub fn raw_items(&self) -> &BTreeMap<RawSource, RawDatum> {
        &self.raw_items
    }

    /// Slots that carry an image.
    pub fn slots(&self) -> impl Iterator<Item = ImageSlot> + '_ {
        self.images.keys().copied()
    }

    /// Sources that carry a raw payload.
    pub fn sources(&self) -> impl Iterator<Item = RawSource> + '_ {
        self.raw_items.keys().copied()
    }

    /// True when neither images nor raw payloads were supplied.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.raw_items.is_empty()
    }
}

impl fmt::Debug for ScanEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Image payloads are summarized by size; dumping them is useless in logs.
        let images: BTreeMap<_, _> = self.images.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("ScanEvidence")
            .field("image_bytes", &images)
            .field("raw_items", &self.raw_items)
            .finish()
    }
}

/// Builder for [`ScanEvidence`]. Accepts every input; last write per key wins.
#[derive(Debug, Default, Clone)]
pub struct ScanEvidenceBuilder {
    evidence: ScanEvidence,
}

impl ScanEvidenceBuilder {
    /// Add (or replace) the image for `slot`.
    pub fn image(mut self, slot: ImageSlot, bytes: impl Into<Vec<u8>>) -> Self {
        self.evidence.images.insert(slot, bytes.into());
        self
    }

    /// Add (or replace) the raw payload for `source`.
    pub fn raw(mut self, source: RawSource, text: impl Into<String>) -> Self {
        self.evidence.raw_items.insert(source, RawDatum::new(text));
        self
    }

    /// In-place variant of [`image`](Self::image) for loops.
    pub fn set_image(&mut self, slot: ImageSlot, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.evidence.images.insert(slot, bytes.into());
        self
    }

    /// In-place variant of [`raw`](Self::raw) for loops.
    pub fn set_raw(&mut self, source: RawSource, text: impl Into<String>) -> &mut Self {
        self.evidence.raw_items.insert(source, RawDatum::new(text));
        self
    }

    pub fn build(self) -> ScanEvidence {
        self.evidence
    }
}

//! Evidence collection from a document folder.
//!
//! Files are recognised by name:
//!
//! | File                  | Evidence              |
//! |-----------------------|-----------------------|
//! | `Pdf417RawData.txt`   | PDF417 raw text       |
//! | `Normal.*`            | ColorFront            |
//! | `NormalBack.*`        | ColorBack             |
//! | `UV.*` / `UVBack.*`   | UVFront / UVBack      |
//! | `IR.*` / `IRBack.*`   | IRFront / IRBack      |
//! | `Face.*`              | CameraFace            |
//! | `rfid/rfid.json`      | RFID raw (compact)    |
//! | `rfid/Face.jpg`       | RfidFace              |
//!
//! Stems compare exactly, ignoring ASCII case. Anything else is ignored.
//! A folder with nothing recognised yields empty evidence; the engine
//! decides what that means.

use docauth_types::{ImageSlot, RawSource, ScanEvidence};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const PDF417_FILE: &str = "Pdf417RawData.txt";
pub const RFID_DIR: &str = "rfid";
pub const RFID_DATA_FILE: &str = "rfid.json";
pub const RFID_FACE_FILE: &str = "Face.jpg";

const IMAGE_STEMS: [(&str, ImageSlot); 7] = [
    ("Normal", ImageSlot::ColorFront),
    ("NormalBack", ImageSlot::ColorBack),
    ("UV", ImageSlot::UvFront),
    ("UVBack", ImageSlot::UvBack),
    ("IR", ImageSlot::IrFront),
    ("IRBack", ImageSlot::IrBack),
    ("Face", ImageSlot::CameraFace),
];

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    InvalidRfid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read(path: &Path) -> Result<Vec<u8>, CollectError> {
    fs::read(path).map_err(|source| CollectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Slot for an image file stem, if the stem is one of the known names.
pub fn slot_for_stem(stem: &str) -> Option<ImageSlot> {
    IMAGE_STEMS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(stem))
        .map(|(_, slot)| *slot)
}

/// Gather every recognised piece of evidence in `folder`.
pub fn collect_evidence(folder: &Path) -> Result<ScanEvidence, CollectError> {
    if !folder.is_dir() {
        return Err(CollectError::NotADirectory(folder.to_path_buf()));
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(|source| CollectError::Io {
            path: folder.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    // Deterministic winner when two files map to one slot.
    entries.sort();

    let mut builder = ScanEvidence::builder();
    let mut filled: Vec<ImageSlot> = Vec::new();

    for path in &entries {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if file_name.eq_ignore_ascii_case(PDF417_FILE) {
            let bytes = read(path)?;
            builder.set_raw(RawSource::Pdf417, String::from_utf8_lossy(&bytes));
            debug!(file = %path.display(), "Collected PDF417 raw data");
            continue;
        }

        let Some(slot) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(slot_for_stem)
        else {
            continue;
        };

        if filled.contains(&slot) {
            warn!(slot = %slot, file = %path.display(), "Slot already filled, file ignored");
            continue;
        }
        builder.set_image(slot, read(path)?);
        filled.push(slot);
        debug!(slot = %slot, file = %path.display(), "Collected image");
    }

    let rfid_dir = folder.join(RFID_DIR);
    let rfid_data = rfid_dir.join(RFID_DATA_FILE);
    if rfid_data.is_file() {
        let bytes = read(&rfid_data)?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| CollectError::InvalidRfid {
                path: rfid_data.clone(),
                source,
            })?;
        builder.set_raw(RawSource::Rfid, value.to_string());
        debug!(file = %rfid_data.display(), "Collected RFID data");

        let rfid_face = rfid_dir.join(RFID_FACE_FILE);
        if rfid_face.is_file() {
            builder.set_image(ImageSlot::RfidFace, read(&rfid_face)?);
        }
    }

    let evidence = builder.build();
    if evidence.is_empty() {
        warn!(folder = %folder.display(), "No recognised evidence, submitting empty request");
    }
    Ok(evidence)
}

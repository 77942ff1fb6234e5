//! Console report for one authenticated folder.

use docauth_client::ClientError;
use docauth_types::{CrossMatch, DocumentFields, TestOutcome, VerificationResult};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const RULE: &str =
    "----------------------------------------------------------------------------------------";

/// Banner printed before a folder is submitted.
pub fn render_header(folder: &Path) -> String {
    format!("{RULE}\nAuthenticate {}:", folder.display())
}

fn outcome_line(outcome: &TestOutcome) -> String {
    format!(
        "    {} - {} {} {}",
        outcome.name, outcome.kind, outcome.status, outcome.confidence
    )
}

fn cross_match_line(m: &CrossMatch) -> String {
    format!(
        "          {} - {} = {};  {} = {} Confidence = {}",
        m.field_name(),
        m.first().source,
        m.first().value,
        m.second().source,
        m.second().value,
        m.confidence()
    )
}

fn fields_json(fields: &DocumentFields) -> String {
    serde_json::to_string_pretty(fields).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}

/// Full report for a finished exchange.
pub fn render_result(
    folder: &Path,
    elapsed: Duration,
    outcome: &Result<VerificationResult, ClientError>,
) -> String {
    let mut out = String::new();
    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            let _ = writeln!(out, "Authentication of {} failed: {e}", folder.display());
            let _ = writeln!(out, "no result");
            return out;
        }
    };

    let _ = writeln!(
        out,
        "Authentication Result for {} ElapsedMilliseconds: {}:",
        folder.display(),
        elapsed.as_millis()
    );
    for group in result.grouped() {
        let _ = writeln!(out, "{}:", group.group);
        for outcome in &group.outcomes {
            let _ = writeln!(out, "{}", outcome_line(outcome));
            for m in outcome.cross_matches.iter().flatten() {
                let _ = writeln!(out, "{}", cross_match_line(m));
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Authentication status = {}", result.overall_status);
    let _ = writeln!(out);
    let _ = writeln!(out, "Document property value: ");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", fields_json(&result.document_fields));
    let _ = writeln!(out);
    let _ = writeln!(out, "PlainDocument property value: ");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", fields_json(&result.plain_document_fields));
    out
}

/// Write each processed image to `<folder>/Processed_<slot>.jpg`.
pub fn save_processed_images(folder: &Path, result: &VerificationResult) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(result.processed_images.len());
    for (slot, bytes) in &result.processed_images {
        let path = folder.join(format!("Processed_{slot}.jpg"));
        fs::write(&path, bytes)?;
        written.push(path);
    }
    Ok(written)
}

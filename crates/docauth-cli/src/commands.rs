//! The `authenticate` command.

use crate::cli::AuthenticateArgs;
use crate::collector::collect_evidence;
use crate::report::{render_header, render_result, save_processed_images};
use docauth_client::{AuthenticationSession, ClientError, ListenerHandle};
use docauth_types::{ScanEvidence, VerificationRequest};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Folder counts after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub authenticated: usize,
    pub failed: usize,
}

/// Print engine notifications to the console.
pub fn attach_console_listeners(session: &AuthenticationSession) -> ListenerHandle {
    session.subscribe(
        |stage| println!("{}", stage.stage),
        |error| println!("Error: {}", error.text),
    )
}

pub fn resolve_folder(root: Option<&Path>, folder: &Path) -> PathBuf {
    match root {
        Some(root) if folder.is_relative() => root.join(folder),
        _ => folder.to_path_buf(),
    }
}

pub fn build_request(evidence: ScanEvidence, args: &AuthenticateArgs) -> VerificationRequest {
    let request = VerificationRequest::new(evidence).with_crop_required(args.crop);
    match args.test_type {
        Some(test_type) => request.with_test_type(test_type.into()),
        None => request,
    }
}

/// Authenticate every folder in turn, writing a report for each to `out`.
pub async fn run_authenticate<W: Write>(
    session: &AuthenticationSession,
    args: &AuthenticateArgs,
    out: &mut W,
) -> io::Result<RunSummary> {
    let mut summary = RunSummary::default();

    for folder in &args.folders {
        let folder = resolve_folder(args.root.as_deref(), folder);
        writeln!(out, "{}", render_header(&folder))?;

        let evidence = match collect_evidence(&folder) {
            Ok(evidence) => evidence,
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "Skipping folder");
                writeln!(out, "{e}\nno result\n")?;
                summary.failed += 1;
                continue;
            }
        };

        let request = build_request(evidence, args);
        let started = Instant::now();
        let outcome = match args.deadline {
            Some(secs) => {
                session
                    .process_with_deadline(request, Duration::from_secs(secs))
                    .await
            }
            None => session.process(request).await,
        };
        writeln!(out, "{}", render_result(&folder, started.elapsed(), &outcome))?;

        match &outcome {
            Ok(result) => {
                summary.authenticated += 1;
                if args.save_processed {
                    match save_processed_images(&folder, result) {
                        Ok(paths) => {
                            for path in paths {
                                info!(path = %path.display(), "Saved processed image");
                            }
                        }
                        Err(e) => warn!(folder = %folder.display(), error = %e, "Failed to save processed images"),
                    }
                }
            }
            Err(ClientError::Disposed) => {
                summary.failed += 1;
                break;
            }
            Err(_) => summary.failed += 1,
        }
    }

    Ok(summary)
}

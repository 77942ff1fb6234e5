//! # docauth CLI
//!
//! Authenticates document folders against a running engine:
//!
//! 1. Resolve session settings (TOML file → environment → flags)
//! 2. Initialise telemetry; JSON logs land in the logging directory
//! 3. Open one session and print stage/error notifications as they arrive
//! 4. Collect evidence per folder, authenticate, print the report
//! 5. Dispose the session, also on Ctrl-C or SIGTERM

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cli;
pub mod collector;
pub mod commands;
pub mod report;
pub mod settings;

pub use cli::{Args, AuthenticateArgs, Command, TestTypeArg};
pub use collector::{collect_evidence, CollectError};
pub use commands::{attach_console_listeners, run_authenticate, RunSummary};
pub use settings::load_session_config;

//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use docauth_types::TestTypeOverride;
use std::path::PathBuf;

/// Authenticate identity documents with the docauth engine.
#[derive(Parser, Debug)]
#[command(name = "docauth", version)]
#[command(about = "Authenticate identity document folders against a running engine")]
pub struct Args {
    /// TOML file with session settings
    #[arg(long, value_name = "FILE", env = "DOCAUTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Engine channel name or socket path
    #[arg(long, value_name = "NAME")]
    pub channel: Option<String>,

    /// Directory for engine and client logs
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Engine host data directory
    #[arg(long, value_name = "DIR")]
    pub host_data_dir: Option<PathBuf>,

    /// Emit console logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authenticate one or more document folders
    Authenticate(AuthenticateArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct AuthenticateArgs {
    /// Document folders, each holding the captures of one document
    #[arg(required = true, value_name = "FOLDER")]
    pub folders: Vec<PathBuf>,

    /// Resolve relative folders against this directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Ask the engine for cropped images
    #[arg(long)]
    pub crop: bool,

    /// Run only one family of checks
    #[arg(long, value_enum)]
    pub test_type: Option<TestTypeArg>,

    /// Give up on a folder after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub deadline: Option<u64>,

    /// Write processed images next to the evidence as Processed_<slot>.jpg
    #[arg(long)]
    pub save_processed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestTypeArg {
    UvMark,
    IrMark,
    Pdf417,
    Rfid,
    Face,
    AntiSpoofing,
}

impl From<TestTypeArg> for TestTypeOverride {
    fn from(arg: TestTypeArg) -> Self {
        match arg {
            TestTypeArg::UvMark => TestTypeOverride::UvMark,
            TestTypeArg::IrMark => TestTypeOverride::IrMark,
            TestTypeArg::Pdf417 => TestTypeOverride::Pdf417,
            TestTypeArg::Rfid => TestTypeOverride::Rfid,
            TestTypeArg::Face => TestTypeOverride::Face,
            TestTypeArg::AntiSpoofing => TestTypeOverride::AntiSpoofing,
        }
    }
}

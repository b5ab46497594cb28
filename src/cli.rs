//! Command-line arguments and exit status mapping for the `stress-estimation` binary.

use crate::config::Config;
use crate::face_detection::FaceSelection;
use crate::{Error, FaultKind};
use clap::Parser;
use std::path::PathBuf;

/// Exit status for a successful assessment
pub const EXIT_SUCCESS: u8 = 0;

/// Exit status when processing failed on our side
pub const EXIT_SERVER_FAULT: u8 = 1;

/// Exit status when the input image could not be used
pub const EXIT_CLIENT_FAULT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "stress-estimation", author, version, about, long_about = None)]
pub struct Args {
    /// Image file to assess
    #[arg(required_unless_present = "print_config")]
    pub image: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Face to score when several are detected (first, largest)
    #[arg(short, long)]
    pub selection: Option<FaceSelection>,

    /// Pretty-print the JSON result
    #[arg(short, long)]
    pub pretty: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(selection) = self.selection {
            config.face_detection.selection = selection;
        }
    }
}

/// Message for the `{"error": ...}` body and the exit status for a failure
pub fn failure_report(error: &anyhow::Error) -> (String, u8) {
    match error.downcast_ref::<Error>() {
        Some(e) if e.fault_kind() == FaultKind::Client => (e.public_message(), EXIT_CLIENT_FAULT),
        _ => (format!("{error:#}"), EXIT_SERVER_FAULT),
    }
}

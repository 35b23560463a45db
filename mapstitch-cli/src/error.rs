//! CLI error handling with user-friendly messages.
//!
//! Every failure of the command ends up here so that messages and exit codes
//! stay consistent.

use std::fmt;
use std::path::PathBuf;
use std::process;

use mapstitch::config::ConfigError;
use mapstitch::output::OutputError;
use mapstitch::PipelineError;

/// Exit code used when the user interrupted the run.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Invalid arguments or configuration file
    Config(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// The stitching run failed
    Stitch(PipelineError),
    /// Failed to write the image
    Output(OutputError),
    /// Failed to write the link file
    LinkFile { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Stitch(e) if e.is_cancelled() => EXIT_INTERRUPTED,
            CliError::Config(_) => 2,
            CliError::Stitch(e) if e.is_rejected_request() => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Stitch(e) if e.is_recoverable() => {
                eprintln!();
                eprintln!("The provider has no imagery for part of this region.");
                eprintln!("  1. Try a lower zoom level (-z)");
                eprintln!("  2. Try another provider (--provider) or the map style");
            }
            CliError::Stitch(PipelineError::Timeout(_)) => {
                eprintln!();
                eprintln!("Raise --timeout, or reduce the region or zoom level.");
            }
            CliError::Stitch(PipelineError::Grid(_)) => {
                eprintln!();
                eprintln!("--from must be the north-west corner and --to the south-east one.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Stitch(PipelineError::Cancelled) => write!(f, "Interrupted"),
            CliError::Stitch(e) => write!(f, "Failed to build map: {}", e),
            CliError::Output(e) => write!(f, "{}", e),
            CliError::LinkFile { path, error } => {
                write!(f, "Failed to write link file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::Stitch(e) => Some(e),
            CliError::Output(e) => Some(e),
            CliError::LinkFile { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Stitch(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<OutputError> for CliError {
    fn from(e: OutputError) -> Self {
        CliError::Output(e)
    }
}

//! CLI error types with exit code handling

use miette::Diagnostic;
use scheriff_core::ValidatorError;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Schema loading or CRD ingestion failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validator(#[from] ValidatorError),

    /// Invalid combination of arguments
    #[error("{message}")]
    #[diagnostic(code(scheriff::cli::usage), help("run `scheriff --help` for usage"))]
    Usage { message: String },

    /// Results could not be written
    #[error("Failed to write output: {message}")]
    #[diagnostic(code(scheriff::cli::output))]
    Output { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Validator(_) | CliError::Usage { .. } | CliError::Output { .. } => {
                exit_codes::ERROR
            }
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Output {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

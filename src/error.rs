use std::path::PathBuf;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Decode Error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Analysis Error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Analysis task failed: {0}")]
    Task(String),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        AppError::Task(error.to_string())
    }
}

// Decoder Error Type, surfaced verbatim to the user
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported image: {reason}")]
    Unsupported { reason: String },
    #[error("Corrupt or truncated image: {reason}")]
    Corrupt { reason: String },
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        DecodeError::Unsupported {
            reason: reason.into(),
        }
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        DecodeError::Corrupt {
            reason: reason.into(),
        }
    }
}

// Analysis Error Type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid image data: {0}")]
    EmptyInput(String),
    #[error("Degenerate range: max {max} is below min {min}")]
    DegenerateRange { min: f64, max: f64 },
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl AnalysisError {
    pub fn empty(reason: impl Into<String>) -> Self {
        AnalysisError::EmptyInput(reason.into())
    }
}

pub mod analysis;
pub mod app;
pub mod common;
pub mod config;
pub mod decode;
pub mod error;
pub mod pipeline;

pub use error::{AnalysisError, AppError, DecodeError};

pub use analysis::{AnalysisReport, ComparisonResult};
pub use config::Configuration;
pub use decode::{FileDecoder, ImageDecoder};
pub use pipeline::{AnalysisService, AnalysisSession, LoadOutcome, Slot};

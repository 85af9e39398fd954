pub mod exr_header;
pub mod file_decoder;

pub use file_decoder::FileDecoder;

use crate::common::SampleSet;
use crate::error::DecodeError;
use async_trait::async_trait;
use std::path::Path;

/// Turns a file on disk into normalized samples. A failed decode never yields a partial set.
#[async_trait]
pub trait ImageDecoder: Send + Sync {
    async fn decode(&self, path: &Path) -> Result<SampleSet, DecodeError>;
}

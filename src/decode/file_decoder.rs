use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

use super::exr_header::{self, ExrHeaderInfo};
use super::ImageDecoder;
use crate::common::{Channel, SampleSet, SourceMetadata};
use crate::error::DecodeError;

const RGB: [Channel; 3] = [Channel::R, Channel::G, Channel::B];
const RGBA: [Channel; 4] = [Channel::R, Channel::G, Channel::B, Channel::A];

/// Decodes pixels with `image` and, for OpenEXR files, header metadata with `exr`.
#[derive(Debug, Clone, Default)]
pub struct FileDecoder;

impl FileDecoder {
    pub fn new() -> Self {
        Self
    }

    fn map_image_error(path: &Path, error: ImageError) -> DecodeError {
        match error {
            ImageError::IoError(io) if io.kind() == ErrorKind::NotFound => {
                DecodeError::NotFound(path.to_path_buf())
            }
            ImageError::IoError(io) => DecodeError::Io(io),
            ImageError::Unsupported(e) => DecodeError::unsupported(e.to_string()),
            ImageError::Limits(e) => DecodeError::unsupported(e.to_string()),
            other => DecodeError::corrupt(other.to_string()),
        }
    }

    fn decode_blocking(path: PathBuf, file_size: u64) -> Result<SampleSet, DecodeError> {
        let start = Instant::now();
        let header = if exr_header::is_exr(&path) {
            exr_header::read_header(&path)?
        } else {
            ExrHeaderInfo::default()
        };

        let image = image::open(&path).map_err(|e| Self::map_image_error(&path, e))?;
        let (width, height) = image.dimensions();
        let channels = split_planes(image);

        let metadata = SourceMetadata {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            file_size: Some(file_size),
            compression: header.compression,
            chromaticities: header.chromaticities,
            sample_types: header.sample_types,
        };

        let mut samples = SampleSet::new(width, height, channels)
            .map_err(|e| DecodeError::corrupt(e.to_string()))?
            .with_metadata(metadata);
        if let Some(tag) = header.color_tag {
            samples = samples.with_declared_color_tag(tag);
        }

        debug!(
            "Decoded {}x{} with {} channels in {}us",
            width,
            height,
            samples.channels().count(),
            start.elapsed().as_micros()
        );
        Ok(samples)
    }
}

/// Interleaved f32 pixels into one plane per channel.
fn split_planes(image: DynamicImage) -> Vec<(Channel, Vec<f32>)> {
    if image.color().has_alpha() {
        let buffer = image.into_rgba32f();
        deinterleave(buffer.as_raw(), &RGBA)
    } else {
        let buffer = image.into_rgb32f();
        deinterleave(buffer.as_raw(), &RGB)
    }
}

fn deinterleave(raw: &[f32], layout: &[Channel]) -> Vec<(Channel, Vec<f32>)> {
    let stride = layout.len();
    layout
        .iter()
        .enumerate()
        .map(|(offset, channel)| {
            let plane = raw.iter().skip(offset).step_by(stride).copied().collect();
            (*channel, plane)
        })
        .collect()
}

#[async_trait]
impl ImageDecoder for FileDecoder {
    #[instrument(skip_all, fields(path = %path.display()))]
    async fn decode(&self, path: &Path) -> Result<SampleSet, DecodeError> {
        let file_size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DecodeError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(DecodeError::Io(e)),
        };
        info!("Decoding {} ({} bytes)", path.display(), file_size);

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::decode_blocking(owned, file_size))
            .await
            .map_err(|e| DecodeError::corrupt(format!("decoder task failed: {}", e)))?
    }
}

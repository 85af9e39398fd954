use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use crate::error::AnalysisError;

/// Storage type of a channel in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    Half,
    Float,
    Uint,
}

/// CIE xy coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chromaticity {
    pub x: f32,
    pub y: f32,
}

impl Chromaticity {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Primaries and white point declared in the file header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chromaticities {
    pub red: Chromaticity,
    pub green: Chromaticity,
    pub blue: Chromaticity,
    pub white: Chromaticity,
}

/// Whatever the decoder could tell us about the source besides pixels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub compression: Option<String>,
    pub chromaticities: Option<Chromaticities>,
    pub sample_types: IndexMap<Channel, SampleType>,
}

impl SourceMetadata {
    /// "32-bit float" if any channel is stored as float, "16-bit half" if all are half.
    pub fn native_type(&self) -> Option<&'static str> {
        let types: Vec<_> = self.sample_types.values().copied().collect();
        if types.is_empty() {
            None
        } else if types.contains(&SampleType::Float) {
            Some("32-bit float")
        } else if types.iter().all(|t| *t == SampleType::Half) {
            Some("16-bit half")
        } else {
            Some("32-bit uint")
        }
    }
}

/// Normalized per-channel samples of one decoded image.
///
/// Every channel holds exactly `width * height` row-major samples. The set is immutable
/// once built and is shared between analyzers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SampleSet {
    width: u32,
    height: u32,
    channels: IndexMap<Channel, Vec<f32>>,
    declared_color_tag: Option<String>,
    metadata: SourceMetadata,
}

impl SampleSet {
    pub fn new(
        width: u32,
        height: u32,
        channels: impl IntoIterator<Item = (Channel, Vec<f32>)>,
    ) -> Result<Self, AnalysisError> {
        let expected = width as usize * height as usize;
        let mut channels: IndexMap<Channel, Vec<f32>> = channels.into_iter().collect();

        if channels.is_empty() {
            return Err(AnalysisError::empty("no channels decoded"));
        }

        for (channel, samples) in &channels {
            if samples.len() != expected {
                return Err(AnalysisError::empty(format!(
                    "channel {} has {} samples, expected {}x{} = {}",
                    channel,
                    samples.len(),
                    width,
                    height,
                    expected
                )));
            }
        }

        channels.sort_keys();

        Ok(Self {
            width,
            height,
            channels,
            declared_color_tag: None,
            metadata: SourceMetadata::default(),
        })
    }

    pub fn with_declared_color_tag(mut self, tag: impl Into<String>) -> Self {
        self.declared_color_tag = Some(tag.into());
        self
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn declared_color_tag(&self) -> Option<&str> {
        self.declared_color_tag.as_deref()
    }

    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    pub fn channel(&self, channel: Channel) -> Option<&[f32]> {
        self.channels.get(&channel).map(|s| s.as_slice())
    }

    pub fn channels(&self) -> impl Iterator<Item = (Channel, &[f32])> {
        self.channels.iter().map(|(c, s)| (*c, s.as_slice()))
    }

    /// R, G, B channels that are present, in that order.
    pub fn color_channels(&self) -> impl Iterator<Item = (Channel, &[f32])> {
        self.channels().filter(|(c, _)| c.is_color())
    }

    /// Fails with `EmptyInput` when the grid is empty or no color channel exists.
    pub fn ensure_non_empty(&self) -> Result<(), AnalysisError> {
        if self.width == 0 || self.height == 0 {
            return Err(AnalysisError::empty(format!(
                "image has zero-sized dimensions {}x{}",
                self.width, self.height
            )));
        }
        if let Some((channel, _)) = self.channels().find(|(_, s)| s.is_empty()) {
            return Err(AnalysisError::empty(format!("channel {} is empty", channel)));
        }
        if self.color_channels().next().is_none() {
            return Err(AnalysisError::empty("no color channels present"));
        }
        Ok(())
    }
}

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::analysis::histogram::{BinRange, DEFAULT_BIN_COUNT, DEFAULT_CAP_PERCENTILE};
use crate::analysis::waveform::{
    SamplingStrategy, WaveformMode, DEFAULT_MAX_COLUMNS, DEFAULT_POINT_BUDGET,
};
use crate::analysis::{HistogramOptions, WaveformOptions};
use crate::common::ChannelVisibility;
use crate::error::AppError;

/// Prefix for environment overrides, e.g. `EXR_INSPECT_BIN_COUNT=512`.
pub const ENV_PREFIX: &str = "EXR_INSPECT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformSampling {
    #[default]
    Seeded,
    Stride,
}

/// User-tunable analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub bin_count: usize,
    pub waveform_mode: WaveformMode,
    pub channel_visibility: ChannelVisibility,
    pub histogram_range: Option<BinRange>,
    pub cap_percentile: f64,
    pub waveform_max_columns: usize,
    pub waveform_point_budget: usize,
    pub waveform_sampling: WaveformSampling,
    pub waveform_seed: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            waveform_mode: WaveformMode::Envelope,
            channel_visibility: ChannelVisibility::all(),
            histogram_range: None,
            cap_percentile: DEFAULT_CAP_PERCENTILE,
            waveform_max_columns: DEFAULT_MAX_COLUMNS,
            waveform_point_budget: DEFAULT_POINT_BUDGET,
            waveform_sampling: WaveformSampling::Seeded,
            waveform_seed: 0,
        }
    }
}

impl Configuration {
    /// Defaults, then the optional file, then `EXR_INSPECT_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let configuration: Self = builder.build()?.try_deserialize()?;
        configuration.validate().map_err(AppError::Config)?;
        Ok(configuration)
    }

    pub fn with_bin_count(mut self, bin_count: usize) -> Self {
        self.bin_count = bin_count;
        self
    }

    pub fn with_waveform_mode(mut self, mode: WaveformMode) -> Self {
        self.waveform_mode = mode;
        self
    }

    pub fn with_channel_visibility(mut self, visibility: ChannelVisibility) -> Self {
        self.channel_visibility = visibility;
        self
    }

    pub fn with_histogram_range(mut self, min: f64, max: f64) -> Self {
        self.histogram_range = Some(BinRange { min, max });
        self
    }

    pub fn with_waveform_sampling(mut self, sampling: WaveformSampling, seed: u64) -> Self {
        self.waveform_sampling = sampling;
        self.waveform_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bin_count == 0 {
            return Err("Bin count must be greater than 0".to_string());
        }

        if self.channel_visibility.is_empty() {
            return Err("At least one of R, G, B must be visible".to_string());
        }

        if !(0.0..=100.0).contains(&self.cap_percentile) {
            return Err("Cap percentile must be between 0 and 100".to_string());
        }

        if self.waveform_max_columns == 0 {
            return Err("Waveform column limit must be greater than 0".to_string());
        }

        if self.waveform_point_budget == 0 {
            return Err("Waveform point budget must be greater than 0".to_string());
        }

        if let Some(range) = self.histogram_range {
            if !range.min.is_finite() || !range.max.is_finite() || range.max < range.min {
                return Err(format!(
                    "Histogram range {}..{} is not a valid interval",
                    range.min, range.max
                ));
            }
        }

        Ok(())
    }

    pub fn histogram_options(&self) -> HistogramOptions {
        let mut options = HistogramOptions::default()
            .with_bin_count(self.bin_count)
            .with_channels(self.channel_visibility);
        if let Some(range) = self.histogram_range {
            options = options.with_range(range.min, range.max);
        }
        options.cap_percentile = self.cap_percentile;
        options
    }

    pub fn waveform_options(&self) -> WaveformOptions {
        let sampling = match self.waveform_sampling {
            WaveformSampling::Seeded => SamplingStrategy::Seeded {
                seed: self.waveform_seed,
            },
            WaveformSampling::Stride => SamplingStrategy::Stride,
        };
        WaveformOptions::default()
            .with_mode(self.waveform_mode)
            .with_channels(self.channel_visibility)
            .with_max_columns(self.waveform_max_columns)
            .with_point_budget(self.waveform_point_budget)
            .with_sampling(sampling)
    }
}

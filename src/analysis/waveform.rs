use indexmap::IndexMap;
use rand::{SeedableRng, rngs::StdRng, seq::index};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::common::{Channel, ChannelVisibility, SampleSet};
use crate::error::AnalysisError;

/// Max output columns for the envelope view (keeps zoom/pan fast while preserving shape).
pub const DEFAULT_MAX_COLUMNS: usize = 1200;
/// Max scatter points per channel for the full-spectrum view.
pub const DEFAULT_POINT_BUDGET: usize = 150_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformMode {
    #[default]
    Envelope,
    FullSpectrum,
}

/// How full-spectrum points are picked when the image exceeds the point budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    Seeded { seed: u64 },
    Stride,
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::Seeded { seed: 0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveformOptions {
    pub mode: WaveformMode,
    pub channels: ChannelVisibility,
    pub max_columns: usize,
    pub point_budget: usize,
    pub sampling: SamplingStrategy,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            mode: WaveformMode::Envelope,
            channels: ChannelVisibility::all(),
            max_columns: DEFAULT_MAX_COLUMNS,
            point_budget: DEFAULT_POINT_BUDGET,
            sampling: SamplingStrategy::default(),
        }
    }
}

impl WaveformOptions {
    pub fn with_mode(mut self, mode: WaveformMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_channels(mut self, channels: ChannelVisibility) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    pub fn with_point_budget(mut self, point_budget: usize) -> Self {
        self.point_budget = point_budget;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingStrategy) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.max_columns == 0 {
            return Err(AnalysisError::InvalidOption(
                "Waveform column limit must be greater than 0".to_string(),
            ));
        }
        if self.point_budget == 0 {
            return Err(AnalysisError::InvalidOption(
                "Waveform point budget must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Value range of one output column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnEnvelope {
    pub min: f32,
    pub max: f32,
}

impl ColumnEnvelope {
    fn include(slot: &mut Option<ColumnEnvelope>, value: f32) {
        match slot {
            Some(envelope) => {
                envelope.min = envelope.min.min(value);
                envelope.max = envelope.max.max(value);
            }
            None => {
                *slot = Some(ColumnEnvelope {
                    min: value,
                    max: value,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub column: u32,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaveformData {
    /// One entry per output column; `None` when the column holds no finite sample.
    Envelope {
        source_width: u32,
        channels: IndexMap<Channel, Vec<Option<ColumnEnvelope>>>,
    },
    FullSpectrum {
        source_width: u32,
        channels: IndexMap<Channel, Vec<ScatterPoint>>,
    },
}

impl WaveformData {
    pub fn mode(&self) -> WaveformMode {
        match self {
            WaveformData::Envelope { .. } => WaveformMode::Envelope,
            WaveformData::FullSpectrum { .. } => WaveformMode::FullSpectrum,
        }
    }

    pub fn source_width(&self) -> u32 {
        match self {
            WaveformData::Envelope { source_width, .. }
            | WaveformData::FullSpectrum { source_width, .. } => *source_width,
        }
    }

    /// Lowest and highest finite value drawn, over all channels.
    pub fn value_extent(&self) -> Option<(f32, f32)> {
        let values: Box<dyn Iterator<Item = (f32, f32)> + '_> = match self {
            WaveformData::Envelope { channels, .. } => Box::new(
                channels
                    .values()
                    .flatten()
                    .flatten()
                    .map(|e| (e.min, e.max)),
            ),
            WaveformData::FullSpectrum { channels, .. } => Box::new(
                channels
                    .values()
                    .flatten()
                    .filter(|p| p.value.is_finite())
                    .map(|p| (p.value, p.value)),
            ),
        };
        values.fold(None, |acc, (lo, hi)| match acc {
            None => Some((lo, hi)),
            Some((a, b)) => Some((a.min(lo), b.max(hi))),
        })
    }
}

/// Cinema-style scopes: per-column envelopes or full-spectrum scatter.
#[derive(Debug, Clone, Default)]
pub struct WaveformBuilder {
    options: WaveformOptions,
}

impl WaveformBuilder {
    pub fn new(options: WaveformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WaveformOptions {
        &self.options
    }

    pub fn build(&self, samples: &SampleSet) -> Result<WaveformData, AnalysisError> {
        let start = Instant::now();
        self.options.validate()?;
        samples.ensure_non_empty()?;

        let visible: Vec<(Channel, &[f32])> = samples
            .color_channels()
            .filter(|(c, _)| self.options.channels.is_visible(*c))
            .collect();

        let data = match self.options.mode {
            WaveformMode::Envelope => self.envelope(samples, &visible),
            WaveformMode::FullSpectrum => self.full_spectrum(samples, &visible),
        };

        debug!(
            "Waveform ({:?}) built in {}us for {} channels",
            self.options.mode,
            start.elapsed().as_micros(),
            visible.len()
        );

        Ok(data)
    }

    /// Single pass over every pixel; source columns are bucketed when wider than
    /// `max_columns`.
    fn envelope(&self, samples: &SampleSet, visible: &[(Channel, &[f32])]) -> WaveformData {
        let width = samples.width() as usize;
        let columns = width.min(self.options.max_columns);

        let mut channels = IndexMap::new();
        for (channel, values) in visible {
            let mut envelopes: Vec<Option<ColumnEnvelope>> = vec![None; columns];
            for row in values.chunks_exact(width) {
                for (x, value) in row.iter().enumerate() {
                    if !value.is_finite() {
                        continue;
                    }
                    let bucket = x * columns / width;
                    ColumnEnvelope::include(&mut envelopes[bucket], *value);
                }
            }
            channels.insert(*channel, envelopes);
        }

        WaveformData::Envelope {
            source_width: samples.width(),
            channels,
        }
    }

    fn full_spectrum(&self, samples: &SampleSet, visible: &[(Channel, &[f32])]) -> WaveformData {
        let indices = self.sample_indices(samples);
        let width = samples.width() as usize;

        let channels = visible
            .iter()
            .map(|(channel, values)| {
                let points = indices
                    .iter()
                    .map(|i| ScatterPoint {
                        column: (i % width) as u32,
                        value: values[*i],
                    })
                    .collect();
                (*channel, points)
            })
            .collect();

        WaveformData::FullSpectrum {
            source_width: samples.width(),
            channels,
        }
    }

    /// Pixel indices to plot, in row-major order, at most `point_budget` of them.
    fn sample_indices(&self, samples: &SampleSet) -> Vec<usize> {
        let pixels = samples.pixel_count();
        let budget = self.options.point_budget;
        if pixels <= budget {
            return (0..pixels).collect();
        }

        match self.options.sampling {
            SamplingStrategy::Seeded { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut picked = index::sample(&mut rng, pixels, budget).into_vec();
                picked.sort_unstable();
                picked
            }
            SamplingStrategy::Stride => stride_grid(
                samples.width() as usize,
                samples.height() as usize,
                budget,
            ),
        }
    }
}

/// Evenly spaced grid of up to 500 columns and as many rows as the budget allows.
fn stride_grid(width: usize, height: usize, budget: usize) -> Vec<usize> {
    let cols = width.min(500).min(budget);
    let rows = height.min((budget / cols).max(1));

    let spread = |count: usize, extent: usize| -> Vec<usize> {
        if count <= 1 {
            return vec![0];
        }
        (0..count)
            .map(|i| i * (extent - 1) / (count - 1))
            .collect()
    };

    let xs = spread(cols, width);
    spread(rows, height)
        .into_iter()
        .flat_map(|y| xs.iter().map(move |x| y * width + x))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_set(width: u32, height: u32, value: f32) -> SampleSet {
        let n = (width * height) as usize;
        SampleSet::new(
            width,
            height,
            [
                (Channel::R, vec![value; n]),
                (Channel::G, vec![value; n]),
                (Channel::B, vec![value; n]),
            ],
        )
        .unwrap()
    }

    fn ramp_set(width: u32, height: u32) -> SampleSet {
        let values: Vec<f32> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x + y) as f32 / (width + height) as f32))
            .collect();
        SampleSet::new(width, height, [(Channel::R, values)]).unwrap()
    }

    #[test]
    fn constant_image_has_flat_envelope() {
        let set = constant_set(17, 9, 0.5);
        let data = WaveformBuilder::default().build(&set).unwrap();
        let WaveformData::Envelope { channels, .. } = data else {
            panic!("expected envelope waveform");
        };
        assert_eq!(channels.len(), 3);
        for envelopes in channels.values() {
            assert_eq!(envelopes.len(), 17);
            for envelope in envelopes {
                assert_eq!(
                    *envelope,
                    Some(ColumnEnvelope { min: 0.5, max: 0.5 })
                );
            }
        }
    }

    #[test]
    fn envelope_tracks_column_extremes() {
        let set = ramp_set(4, 3);
        let data = WaveformBuilder::default().build(&set).unwrap();
        let WaveformData::Envelope { channels, .. } = data else {
            panic!("expected envelope waveform");
        };
        let r = &channels[&Channel::R];
        assert_eq!(r[0], Some(ColumnEnvelope { min: 0.0, max: 2.0 / 7.0 }));
        assert_eq!(r[3], Some(ColumnEnvelope { min: 3.0 / 7.0, max: 5.0 / 7.0 }));
    }

    #[test]
    fn wide_images_are_bucketed() {
        let set = ramp_set(100, 2);
        let data = WaveformBuilder::new(WaveformOptions::default().with_max_columns(10))
            .build(&set)
            .unwrap();
        let WaveformData::Envelope { channels, .. } = data else {
            panic!("expected envelope waveform");
        };
        let r = &channels[&Channel::R];
        assert_eq!(r.len(), 10);
        let first = r[0].unwrap();
        assert_eq!(first.min, 0.0);
        assert_eq!(first.max, 10.0 / 102.0);
    }

    #[test]
    fn full_spectrum_respects_budget_and_seed() {
        let set = ramp_set(64, 64);
        let options = WaveformOptions::default()
            .with_mode(WaveformMode::FullSpectrum)
            .with_point_budget(500)
            .with_sampling(SamplingStrategy::Seeded { seed: 42 });
        let first = WaveformBuilder::new(options.clone()).build(&set).unwrap();
        let second = WaveformBuilder::new(options).build(&set).unwrap();
        assert_eq!(first, second);

        let WaveformData::FullSpectrum { channels, .. } = first else {
            panic!("expected full-spectrum waveform");
        };
        let points = &channels[&Channel::R];
        assert_eq!(points.len(), 500);
        assert!(points.iter().all(|p| p.column < 64));
    }

    #[test]
    fn full_spectrum_keeps_every_pixel_under_budget() {
        let set = ramp_set(8, 8);
        let data = WaveformBuilder::new(WaveformOptions::default().with_mode(WaveformMode::FullSpectrum))
            .build(&set)
            .unwrap();
        assert_eq!(data.mode(), WaveformMode::FullSpectrum);
        let WaveformData::FullSpectrum { channels, .. } = data else {
            panic!("expected full-spectrum waveform");
        };
        assert_eq!(channels[&Channel::R].len(), 64);
    }

    #[test]
    fn stride_sampling_stays_within_budget() {
        let set = ramp_set(1000, 400);
        let data = WaveformBuilder::new(
            WaveformOptions::default()
                .with_mode(WaveformMode::FullSpectrum)
                .with_point_budget(10_000)
                .with_sampling(SamplingStrategy::Stride),
        )
        .build(&set)
        .unwrap();
        let WaveformData::FullSpectrum { channels, .. } = data else {
            panic!("expected full-spectrum waveform");
        };
        let points = &channels[&Channel::R];
        assert_eq!(points.len(), 500 * 20);
        assert_eq!(points[0].column, 0);
        assert_eq!(points[499].column, 999);
    }

    #[test]
    fn zero_sized_image_is_empty_input() {
        let set = SampleSet::new(0, 5, [(Channel::R, Vec::new())]).unwrap();
        assert!(matches!(
            WaveformBuilder::default().build(&set),
            Err(AnalysisError::EmptyInput(_))
        ));
    }

    #[test]
    fn value_extent_spans_all_channels() {
        let set = ramp_set(4, 3);
        let data = WaveformBuilder::default().build(&set).unwrap();
        assert_eq!(data.value_extent(), Some((0.0, 5.0 / 7.0)));
    }
}

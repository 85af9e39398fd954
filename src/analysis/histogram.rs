use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::viewport::CONSTANT_DATA_HALF_SPAN;
use crate::common::{Channel, ChannelVisibility, SampleSet};
use crate::error::AnalysisError;

pub const DEFAULT_BIN_COUNT: usize = 256;
pub const DEFAULT_CAP_PERCENTILE: f64 = 99.0;

/// Explicit binning range shared by all channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramOptions {
    pub bin_count: usize,
    /// Overrides the per-channel data min/max when set.
    pub range: Option<BinRange>,
    pub channels: ChannelVisibility,
    pub cap_percentile: f64,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            range: None,
            channels: ChannelVisibility::all(),
            cap_percentile: DEFAULT_CAP_PERCENTILE,
        }
    }
}

impl HistogramOptions {
    pub fn with_bin_count(mut self, bin_count: usize) -> Self {
        self.bin_count = bin_count;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(BinRange { min, max });
        self
    }

    pub fn with_channels(mut self, channels: ChannelVisibility) -> Self {
        self.channels = channels;
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.bin_count == 0 {
            return Err(AnalysisError::InvalidOption(
                "Histogram bin count must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.cap_percentile) {
            return Err(AnalysisError::InvalidOption(
                "Cap percentile must be between 0 and 100".to_string(),
            ));
        }
        if let Some(range) = self.range {
            if !range.min.is_finite() || !range.max.is_finite() || range.max < range.min {
                return Err(AnalysisError::InvalidOption(format!(
                    "Histogram range {}..{} is not a valid interval",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelHistogram {
    pub counts: Vec<u64>,
    /// Bin boundaries, `counts.len() + 1` entries.
    pub edges: Vec<f64>,
}

impl ChannelHistogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn bin_width(&self) -> f64 {
        (self.edges[self.edges.len() - 1] - self.edges[0]) / self.counts.len() as f64
    }

    /// Counts normalized so the histogram integrates to 1.
    pub fn densities(&self) -> Vec<f64> {
        let norm = self.total() as f64 * self.bin_width();
        if norm <= 0.0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts.iter().map(|c| *c as f64 / norm).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramData {
    pub bin_count: usize,
    pub channels: IndexMap<Channel, ChannelHistogram>,
    /// Y-axis rendering hint; raw counts are never altered by it.
    pub display_cap_count: u64,
}

impl HistogramData {
    /// Lowest and highest edge over all channels.
    pub fn value_extent(&self) -> Option<(f64, f64)> {
        let lo = self.channels.values().map(|h| h.edges[0]).reduce(f64::min)?;
        let hi = self
            .channels
            .values()
            .map(|h| h.edges[h.edges.len() - 1])
            .reduce(f64::max)?;
        Some((lo, hi))
    }
}

/// Uniform-width per-channel binning.
#[derive(Debug, Clone, Default)]
pub struct HistogramBuilder {
    options: HistogramOptions,
}

impl HistogramBuilder {
    pub fn new(options: HistogramOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HistogramOptions {
        &self.options
    }

    pub fn build(&self, samples: &SampleSet) -> Result<HistogramData, AnalysisError> {
        let start = Instant::now();
        self.options.validate()?;
        samples.ensure_non_empty()?;

        let mut channels = IndexMap::new();
        for (channel, values) in samples.color_channels() {
            if !self.options.channels.is_visible(channel) {
                continue;
            }
            let (lo, hi) = match self.options.range {
                Some(range) => (range.min, range.max),
                None => finite_extent(values).unwrap_or((0.0, 1.0)),
            };
            channels.insert(channel, bin_channel(values, lo, hi, self.options.bin_count));
        }

        let display_cap_count = display_cap(
            channels.values().flat_map(|h| h.counts.iter().copied()),
            self.options.cap_percentile,
        );

        debug!(
            "Histogram built in {}us: {} channels x {} bins, cap {}",
            start.elapsed().as_micros(),
            channels.len(),
            self.options.bin_count,
            display_cap_count
        );

        Ok(HistogramData {
            bin_count: self.options.bin_count,
            channels,
            display_cap_count,
        })
    }
}

fn finite_extent(values: &[f32]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| {
            let v = *v as f64;
            match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            }
        })
}

fn bin_channel(values: &[f32], lo: f64, hi: f64, bin_count: usize) -> ChannelHistogram {
    let (lo, hi) = if hi > lo {
        (lo, hi)
    } else {
        (lo - CONSTANT_DATA_HALF_SPAN, hi + CONSTANT_DATA_HALF_SPAN)
    };
    let width = (hi - lo) / bin_count as f64;
    let last = bin_count - 1;

    let mut counts = vec![0u64; bin_count];
    for value in values {
        let value = *value as f64;
        // NaN lands in the first bin, infinities clamp to the edges
        let index = if value.is_nan() || value <= lo {
            0
        } else if value >= hi {
            last
        } else {
            (((value - lo) / width) as usize).min(last)
        };
        counts[index] += 1;
    }

    let edges = (0..=bin_count).map(|i| lo + width * i as f64).collect();
    ChannelHistogram { counts, edges }
}

/// Nearest-rank percentile of the non-zero counts.
fn display_cap(counts: impl Iterator<Item = u64>, percentile: f64) -> u64 {
    let mut non_zero: Vec<u64> = counts.filter(|c| *c > 0).collect();
    if non_zero.is_empty() {
        return 0;
    }
    non_zero.sort_unstable();
    let rank = ((percentile / 100.0) * non_zero.len() as f64).ceil() as usize;
    non_zero[rank.clamp(1, non_zero.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> SampleSet {
        let n = 32 * 16;
        let r: Vec<f32> = (0..n).map(|i| (i as f32 / n as f32) * 4.0 - 1.0).collect();
        let g: Vec<f32> = (0..n).map(|i| ((i * 37) % 101) as f32 / 100.0).collect();
        let mut b = vec![0.25f32; n];
        b[3] = f32::NAN;
        b[7] = f32::INFINITY;
        b[9] = f32::NEG_INFINITY;
        SampleSet::new(32, 16, [(Channel::R, r), (Channel::G, g), (Channel::B, b)]).unwrap()
    }

    #[test]
    fn bin_counts_sum_to_sample_count() {
        let set = sample_set();
        for bin_count in [1, 2, 7, 256, 1000] {
            let histogram = HistogramBuilder::new(HistogramOptions::default().with_bin_count(bin_count))
                .build(&set)
                .unwrap();
            for (channel, data) in &histogram.channels {
                assert_eq!(data.total(), set.pixel_count() as u64, "channel {}", channel);
                assert_eq!(data.edges.len(), bin_count + 1);
            }
        }
    }

    #[test]
    fn out_of_range_samples_clamp_to_edge_bins() {
        let set = sample_set();
        let histogram = HistogramBuilder::new(
            HistogramOptions::default()
                .with_bin_count(10)
                .with_range(0.0, 1.0),
        )
        .build(&set)
        .unwrap();
        let r = &histogram.channels[&Channel::R];
        assert_eq!(r.total(), set.pixel_count() as u64);
        // a quarter of R sits below zero
        assert!(r.counts[0] >= set.pixel_count() as u64 / 4);
        assert_eq!(r.edges[0], 0.0);
        assert_eq!(r.edges[10], 1.0);
    }

    #[test]
    fn building_twice_is_bit_identical() {
        let set = sample_set();
        let builder = HistogramBuilder::new(HistogramOptions::default().with_bin_count(64));
        assert_eq!(builder.build(&set).unwrap(), builder.build(&set).unwrap());
    }

    #[test]
    fn respects_channel_visibility() {
        let set = sample_set();
        let histogram = HistogramBuilder::new(
            HistogramOptions::default().with_channels(ChannelVisibility::only(&[Channel::G])),
        )
        .build(&set)
        .unwrap();
        assert_eq!(histogram.channels.len(), 1);
        assert!(histogram.channels.contains_key(&Channel::G));
    }

    #[test]
    fn constant_channel_uses_synthesized_span() {
        let set = SampleSet::new(4, 4, [(Channel::R, vec![0.5; 16])]).unwrap();
        let histogram = HistogramBuilder::new(HistogramOptions::default().with_bin_count(4))
            .build(&set)
            .unwrap();
        let r = &histogram.channels[&Channel::R];
        assert_eq!(r.edges[0], 0.0);
        assert_eq!(r.edges[4], 1.0);
        assert_eq!(r.counts, vec![0, 0, 16, 0]);
        assert_eq!(histogram.display_cap_count, 16);
    }

    #[test]
    fn display_cap_ignores_single_spike() {
        let mut counts = vec![10u64; 199];
        counts.push(100_000);
        assert_eq!(display_cap(counts.into_iter(), 99.0), 10);
        assert_eq!(display_cap(std::iter::empty(), 99.0), 0);
    }

    #[test]
    fn densities_integrate_to_one() {
        let set = sample_set();
        let histogram = HistogramBuilder::default().build(&set).unwrap();
        let g = &histogram.channels[&Channel::G];
        let integral: f64 = g.densities().iter().map(|d| d * g.bin_width()).sum();
        assert!((integral - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_zero_bins() {
        let set = sample_set();
        let result = HistogramBuilder::new(HistogramOptions::default().with_bin_count(0)).build(&set);
        assert!(matches!(result, Err(AnalysisError::InvalidOption(_))));
    }
}

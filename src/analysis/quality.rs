use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::common::{Channel, SampleSet};
use crate::error::AnalysisError;

/// Lower and upper bound of the midtone band used for the step-size figure.
pub const MIDTONE_BAND: (f32, f32) = (0.2, 0.8);

/// Size of one 8-bit code value in normalized units.
const EIGHT_BIT_STEP: f64 = 1.0 / 255.0;

/// Unique-value thresholds for 4, 3 and 2 stars; 5 stars at `FIVE_STAR_UNIQUE`.
pub const FIVE_STAR_UNIQUE: usize = 8000;
pub const FOUR_STAR_UNIQUE: usize = 3000;
pub const THREE_STAR_UNIQUE: usize = 1000;
pub const TWO_STAR_UNIQUE: usize = 360;

/// 1..=5 star verdict on grading headroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarRating(u8);

impl StarRating {
    /// Step function over the distinct-value count. Lower bounds are inclusive.
    pub fn from_unique_count(unique: usize) -> Self {
        let stars = if unique >= FIVE_STAR_UNIQUE {
            5
        } else if unique >= FOUR_STAR_UNIQUE {
            4
        } else if unique >= THREE_STAR_UNIQUE {
            3
        } else if unique >= TWO_STAR_UNIQUE {
            2
        } else {
            1
        };
        Self(stars)
    }

    pub fn stars(&self) -> u8 {
        self.0
    }

    pub fn grade(&self) -> QualityGrade {
        match self.0 {
            5 => QualityGrade::CinemaGrade,
            4 => QualityGrade::Good,
            3 => QualityGrade::Acceptable,
            2 => QualityGrade::Poor,
            _ => QualityGrade::EightBitEquivalent,
        }
    }

    /// "★★★☆☆"
    pub fn glyphs(&self) -> String {
        let filled = self.0 as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    CinemaGrade,
    Good,
    Acceptable,
    Poor,
    EightBitEquivalent,
}

impl QualityGrade {
    pub fn label(&self) -> &'static str {
        match self {
            QualityGrade::CinemaGrade => "Cinema-grade",
            QualityGrade::Good => "Good",
            QualityGrade::Acceptable => "Acceptable",
            QualityGrade::Poor => "Poor",
            QualityGrade::EightBitEquivalent => "8-bit equivalent",
        }
    }
}

/// Per-channel figures behind [`QualityMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelQuality {
    pub unique_value_count: usize,
    pub effective_bits: f64,
    /// NaN, like `max` and `mean`, when the channel has no finite sample.
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub fraction_above_one: f64,
    pub non_finite_count: usize,
    /// Smallest gap between neighbouring unique midtone values; `None` when undefined.
    pub midtone_step_size: Option<f64>,
    pub midtone_mean_step: Option<f64>,
    /// How many times finer the mean midtone step is than an 8-bit code value.
    pub step_ratio_vs_8bit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Range over channels with finite samples; NaN when there are none.
    pub min_value: f32,
    pub max_value: f32,
    pub unique_value_count: usize,
    pub effective_bits: f64,
    pub star_rating: StarRating,
    pub fraction_above_one: f64,
    pub midtone_step_size: Option<f64>,
    pub channels: IndexMap<Channel, ChannelQuality>,
}

impl QualityMetrics {
    pub fn grade(&self) -> QualityGrade {
        self.star_rating.grade()
    }

    /// Mean of the per-channel 8-bit step ratios that are defined.
    pub fn average_step_ratio(&self) -> Option<f64> {
        let ratios: Vec<f64> = self
            .channels
            .values()
            .filter_map(|c| c.step_ratio_vs_8bit)
            .collect();
        if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
        }
    }
}

/// Bit-depth and headroom estimation from raw samples.
#[derive(Debug, Clone, Default)]
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, samples: &SampleSet) -> Result<QualityMetrics, AnalysisError> {
        let start = Instant::now();
        samples.ensure_non_empty()?;

        let mut channels = IndexMap::new();
        for (channel, values) in samples.color_channels() {
            let quality = Self::analyze_channel(values);
            if quality.unique_value_count == 0 {
                debug!("Channel {} has no finite samples", channel);
            }
            channels.insert(channel, quality);
        }

        let unique_value_count = channels
            .values()
            .map(|c| c.unique_value_count)
            .max()
            .unwrap_or(0);
        let effective_bits = channels
            .values()
            .map(|c| c.effective_bits)
            .fold(0.0, f64::max);
        let fraction_above_one = channels
            .values()
            .map(|c| c.fraction_above_one)
            .fold(0.0, f64::max);
        let (min_value, max_value) = channels
            .values()
            .filter(|c| c.unique_value_count > 0)
            .map(|c| (c.min, c.max))
            .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
            .unwrap_or((f32::NAN, f32::NAN));
        let midtone_step_size = channels
            .values()
            .filter_map(|c| c.midtone_step_size)
            .reduce(f64::min);

        let metrics = QualityMetrics {
            min_value,
            max_value,
            unique_value_count,
            effective_bits,
            star_rating: StarRating::from_unique_count(unique_value_count),
            fraction_above_one,
            midtone_step_size,
            channels,
        };

        debug!(
            "Quality analysis completed in {}us: {} unique values, {:.2} effective bits",
            start.elapsed().as_micros(),
            metrics.unique_value_count,
            metrics.effective_bits
        );

        Ok(metrics)
    }

    fn analyze_channel(values: &[f32]) -> ChannelQuality {
        let mut finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let non_finite_count = values.len() - finite.len();
        let above_one = values.iter().filter(|v| **v > 1.0).count();
        let fraction_above_one = above_one as f64 / values.len() as f64;

        if finite.is_empty() {
            return ChannelQuality {
                unique_value_count: 0,
                effective_bits: 0.0,
                min: f32::NAN,
                max: f32::NAN,
                mean: f64::NAN,
                fraction_above_one,
                non_finite_count,
                midtone_step_size: None,
                midtone_mean_step: None,
                step_ratio_vs_8bit: None,
            };
        }

        let mean = finite.iter().map(|v| *v as f64).sum::<f64>() / finite.len() as f64;

        // total_cmp keeps -0.0 next to 0.0 so dedup merges them
        finite.sort_unstable_by(f32::total_cmp);
        finite.dedup_by(|a, b| a == b);
        let unique = finite;

        let unique_value_count = unique.len();
        let (min, max) = (unique[0], unique[unique.len() - 1]);
        let (midtone_step_size, midtone_mean_step) = midtone_steps(&unique);

        ChannelQuality {
            unique_value_count,
            effective_bits: effective_bits(unique_value_count),
            min,
            max,
            mean,
            fraction_above_one,
            non_finite_count,
            midtone_step_size,
            midtone_mean_step,
            step_ratio_vs_8bit: midtone_mean_step
                .filter(|step| *step > 0.0)
                .map(|step| EIGHT_BIT_STEP / step),
        }
    }
}

/// `log2(unique)`, clamped at zero.
pub fn effective_bits(unique_value_count: usize) -> f64 {
    if unique_value_count <= 1 {
        0.0
    } else {
        (unique_value_count as f64).log2()
    }
}

/// Smallest and mean gap between consecutive sorted unique values inside the midtone band.
fn midtone_steps(sorted_unique: &[f32]) -> (Option<f64>, Option<f64>) {
    let (low, high) = MIDTONE_BAND;
    let band: Vec<f64> = sorted_unique
        .iter()
        .filter(|v| **v >= low && **v <= high)
        .map(|v| *v as f64)
        .collect();

    if band.len() < 2 {
        return (None, None);
    }

    let gaps: Vec<f64> = band.windows(2).map(|w| w[1] - w[0]).collect();
    let smallest = gaps.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    (Some(smallest), Some(mean))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(levels: usize, pixels: usize) -> Vec<f32> {
        (0..pixels)
            .map(|i| (i % levels) as f32 / levels as f32)
            .collect()
    }

    fn rgb_set(width: u32, height: u32, values: Vec<f32>) -> SampleSet {
        SampleSet::new(
            width,
            height,
            [
                (Channel::R, values.clone()),
                (Channel::G, values.clone()),
                (Channel::B, values),
            ],
        )
        .unwrap()
    }

    #[test]
    fn star_rating_boundaries() {
        assert_eq!(StarRating::from_unique_count(8000).stars(), 5);
        assert_eq!(StarRating::from_unique_count(7999).stars(), 4);
        assert_eq!(StarRating::from_unique_count(3000).stars(), 4);
        assert_eq!(StarRating::from_unique_count(2999).stars(), 3);
        assert_eq!(StarRating::from_unique_count(1000).stars(), 3);
        assert_eq!(StarRating::from_unique_count(999).stars(), 2);
        assert_eq!(StarRating::from_unique_count(360).stars(), 2);
        assert_eq!(StarRating::from_unique_count(359).stars(), 1);
        assert_eq!(StarRating::from_unique_count(0).stars(), 1);
    }

    #[test]
    fn star_rating_is_monotonic() {
        let mut previous = StarRating::from_unique_count(0);
        for unique in (0..20_000).step_by(7) {
            let rating = StarRating::from_unique_count(unique);
            assert!(rating >= previous, "rating dropped at {}", unique);
            previous = rating;
        }
    }

    #[test]
    fn counts_exact_unique_values() {
        let set = rgb_set(64, 64, gradient(256, 64 * 64));
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        assert_eq!(metrics.unique_value_count, 256);
        assert!((metrics.effective_bits - 8.0).abs() < 1e-9);
        assert_eq!(metrics.star_rating.stars(), 1);
        assert_eq!(metrics.grade(), QualityGrade::EightBitEquivalent);
        assert_eq!(metrics.channels.len(), 3);
    }

    #[test]
    fn signed_zero_counts_once() {
        let set = rgb_set(2, 1, vec![0.0, -0.0]);
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        assert_eq!(metrics.unique_value_count, 1);
        assert_eq!(metrics.effective_bits, 0.0);
    }

    #[test]
    fn reports_maximum_across_channels() {
        let set = SampleSet::new(
            4,
            1,
            [
                (Channel::R, vec![0.1, 0.2, 0.3, 0.4]),
                (Channel::G, vec![0.5, 0.5, 2.0, 3.0]),
                (Channel::B, vec![0.0, 0.0, 0.0, 0.0]),
            ],
        )
        .unwrap();
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        assert_eq!(metrics.unique_value_count, 4);
        assert_eq!(metrics.channels[&Channel::B].unique_value_count, 1);
        assert!((metrics.fraction_above_one - 0.5).abs() < 1e-12);
        assert_eq!(metrics.min_value, 0.0);
        assert_eq!(metrics.max_value, 3.0);
    }

    #[test]
    fn midtone_step_is_smallest_gap_inside_band() {
        let set = rgb_set(5, 1, vec![0.1, 0.25, 0.3, 0.5, 0.9]);
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        let step = metrics.midtone_step_size.unwrap();
        assert!((step - 0.05).abs() < 1e-6);
    }

    #[test]
    fn midtone_step_undefined_with_single_midtone_value() {
        let set = rgb_set(3, 1, vec![0.0, 0.5, 1.0]);
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        assert_eq!(metrics.midtone_step_size, None);
        assert_eq!(metrics.average_step_ratio(), None);
    }

    #[test]
    fn fine_midtones_are_finer_than_8bit() {
        let values: Vec<f32> = (0..1024).map(|i| i as f32 / 1023.0).collect();
        let set = rgb_set(1024, 1, values);
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        let ratio = metrics.average_step_ratio().unwrap();
        assert!(ratio > 3.5 && ratio < 4.5, "ratio was {}", ratio);
    }

    #[test]
    fn ignores_alpha_and_non_finite_samples() {
        let set = SampleSet::new(
            3,
            1,
            [
                (Channel::R, vec![0.1, f32::NAN, 0.3]),
                (Channel::A, (0..3).map(|i| i as f32).collect()),
            ],
        )
        .unwrap();
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        assert!(!metrics.channels.contains_key(&Channel::A));
        assert_eq!(metrics.channels[&Channel::R].non_finite_count, 1);
        assert_eq!(metrics.unique_value_count, 2);
    }

    #[test]
    fn empty_input_fails() {
        let set = SampleSet::new(0, 0, [(Channel::R, Vec::new())]).unwrap();
        assert!(matches!(
            QualityAnalyzer::new().analyze(&set),
            Err(AnalysisError::EmptyInput(_))
        ));
    }

    #[test]
    fn channel_without_finite_samples_still_analyzes() {
        let set = SampleSet::new(
            2,
            1,
            [
                (Channel::R, vec![0.25, 0.5]),
                (Channel::G, vec![0.25, 0.5]),
                (Channel::B, vec![f32::NAN, f32::INFINITY]),
            ],
        )
        .unwrap();
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();

        let blue = &metrics.channels[&Channel::B];
        assert_eq!(blue.unique_value_count, 0);
        assert_eq!(blue.effective_bits, 0.0);
        assert_eq!(blue.non_finite_count, 2);
        assert!(blue.min.is_nan() && blue.max.is_nan() && blue.mean.is_nan());

        assert_eq!(metrics.unique_value_count, 2);
        assert_eq!(metrics.min_value, 0.25);
        assert_eq!(metrics.max_value, 0.5);
        assert!((metrics.midtone_step_size.unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn all_non_finite_input_rates_one_star() {
        let set = rgb_set(2, 1, vec![f32::NAN, f32::INFINITY]);
        let metrics = QualityAnalyzer::new().analyze(&set).unwrap();
        assert_eq!(metrics.unique_value_count, 0);
        assert_eq!(metrics.star_rating.stars(), 1);
        assert_eq!(metrics.effective_bits, 0.0);
        assert!(metrics.min_value.is_nan() && metrics.max_value.is_nan());
        assert_eq!(metrics.midtone_step_size, None);
    }
}

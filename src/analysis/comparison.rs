use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::color::{ColorSpace, Encoding};
use super::report::AnalysisReport;
use crate::common::Channel;

/// Effective-bit difference below which two files are reported as equivalent.
pub const VERDICT_BITS_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalDiff<T> {
    pub a: T,
    pub b: T,
    pub matches: bool,
}

impl<T: PartialEq + Copy> CategoricalDiff<T> {
    fn of(a: T, b: T) -> Self {
        Self {
            a,
            b,
            matches: a == b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Primary file carries more effective bits.
    First,
    /// Comparison file carries more effective bits.
    Second,
    Equivalent,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::First => "first file has more effective bits",
            Verdict::Second => "second file has more effective bits",
            Verdict::Equivalent => "files are equivalent in precision",
        })
    }
}

/// Side-by-side differences, all numeric deltas are `a - b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub dimensions_match: bool,
    pub dimensions_a: (u32, u32),
    pub dimensions_b: (u32, u32),
    pub effective_bits_delta: f64,
    pub unique_value_count_delta: i64,
    pub channel_unique_deltas: IndexMap<Channel, i64>,
    pub fraction_above_one_delta: f64,
    pub min_value_delta: f32,
    pub max_value_delta: f32,
    pub star_delta: i8,
    /// None unless both sides have a defined midtone step.
    pub midtone_step_delta: Option<f64>,
    pub color_space: CategoricalDiff<ColorSpace>,
    pub encoding: CategoricalDiff<Encoding>,
    pub verdict: Verdict,
}

impl ComparisonResult {
    pub fn is_identical_quality(&self) -> bool {
        self.dimensions_match
            && self.unique_value_count_delta == 0
            && self.color_space.matches
            && self.encoding.matches
    }
}

fn count_delta(a: usize, b: usize) -> i64 {
    a as i64 - b as i64
}

pub fn compare(a: &AnalysisReport, b: &AnalysisReport) -> ComparisonResult {
    let (qa, qb) = (&a.quality, &b.quality);

    let channel_unique_deltas = qa
        .channels
        .iter()
        .filter_map(|(channel, ca)| {
            qb.channels
                .get(channel)
                .map(|cb| (*channel, count_delta(ca.unique_value_count, cb.unique_value_count)))
        })
        .collect();

    let effective_bits_delta = qa.effective_bits - qb.effective_bits;
    let verdict = if effective_bits_delta.abs() <= VERDICT_BITS_THRESHOLD {
        Verdict::Equivalent
    } else if effective_bits_delta > 0.0 {
        Verdict::First
    } else {
        Verdict::Second
    };

    ComparisonResult {
        dimensions_match: a.dimensions() == b.dimensions(),
        dimensions_a: a.dimensions(),
        dimensions_b: b.dimensions(),
        effective_bits_delta,
        unique_value_count_delta: count_delta(qa.unique_value_count, qb.unique_value_count),
        channel_unique_deltas,
        fraction_above_one_delta: qa.fraction_above_one - qb.fraction_above_one,
        min_value_delta: qa.min_value - qb.min_value,
        max_value_delta: qa.max_value - qb.max_value,
        star_delta: qa.star_rating.stars() as i8 - qb.star_rating.stars() as i8,
        midtone_step_delta: qa
            .midtone_step_size
            .zip(qb.midtone_step_size)
            .map(|(x, y)| x - y),
        color_space: CategoricalDiff::of(a.color.color_space, b.color.color_space),
        encoding: CategoricalDiff::of(a.color.encoding, b.color.encoding),
        verdict,
    }
}

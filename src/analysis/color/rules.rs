//! Ordered classification rules for color space and transfer encoding.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::primaries::{self, APPROXIMATE_MATCH_DISTANCE, EXACT_MATCH_DISTANCE};
use super::{ColorEncodingInfo, ColorSpace, Encoding};
use crate::common::SampleSet;

/// Components at or below this count as negative gamut excursions.
const NEGATIVE_EPSILON: f32 = -1e-4;
/// Share of pixels with a negative component that marks an overflowing container.
const NEGATIVE_PIXEL_FRACTION: f64 = 0.001;
/// Normalized entropy across log2 bins above which the shape reads as log-encoded.
const LOG_UNIFORMITY_THRESHOLD: f64 = 0.85;

/// Statistics every rule reads from, computed once per sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationContext {
    pub declared_tag: Option<String>,
    pub chromaticities: Option<crate::common::Chromaticities>,
    pub average_mean: f64,
    pub average_max: f64,
    pub min_value: f32,
    pub max_value: f32,
    pub negative_pixel_fraction: f64,
    /// Normalized entropy of positive samples across one-stop (log2) bins, in [0, 1].
    pub log_uniformity: f64,
}

impl ClassificationContext {
    /// `None` when no color channel holds a finite sample.
    pub fn from_samples(samples: &SampleSet) -> Option<Self> {
        let mut means = Vec::new();
        let mut maxes = Vec::new();
        let mut min_value = f32::INFINITY;
        let mut max_value = f32::NEG_INFINITY;
        let mut stops: BTreeMap<i32, usize> = BTreeMap::new();

        for (_, values) in samples.color_channels() {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            let mut channel_max = f32::NEG_INFINITY;
            for v in values.iter().copied().filter(|v| v.is_finite()) {
                sum += v as f64;
                count += 1;
                channel_max = channel_max.max(v);
                min_value = min_value.min(v);
                if v > 0.0 {
                    *stops.entry(v.log2().floor() as i32).or_insert(0) += 1;
                }
            }
            if count > 0 {
                means.push(sum / count as f64);
                maxes.push(channel_max as f64);
                max_value = max_value.max(channel_max);
            }
        }

        if means.is_empty() {
            return None;
        }

        Some(Self {
            declared_tag: samples.declared_color_tag().map(str::to_string),
            chromaticities: samples.metadata().chromaticities,
            average_mean: means.iter().sum::<f64>() / means.len() as f64,
            average_max: maxes.iter().sum::<f64>() / maxes.len() as f64,
            min_value,
            max_value,
            negative_pixel_fraction: negative_pixel_fraction(samples),
            log_uniformity: normalized_entropy(&stops),
        })
    }

    /// Transfer encoding read from the value distribution.
    pub fn distribution_encoding(&self) -> Option<Encoding> {
        let (mean, max) = (self.average_mean, self.average_max);
        if max > 5.0 && mean < 2.0 {
            Some(Encoding::Linear)
        } else if max < 1.5 && mean > 0.15 {
            Some(Encoding::Log)
        } else if max < 1.1 {
            Some(Encoding::Linear)
        } else if max > 1.5 {
            Some(Encoding::Linear)
        } else if self.log_uniformity >= LOG_UNIFORMITY_THRESHOLD {
            Some(Encoding::Log)
        } else {
            None
        }
    }

    /// Gamut guess from channel extrema, with a flag for the ambiguous default.
    pub fn gamut_from_extents(&self) -> (ColorSpace, bool) {
        if self.negative_pixel_fraction > NEGATIVE_PIXEL_FRACTION {
            // colors outside the container primaries come out negative
            (ColorSpace::Rec709, false)
        } else if self.min_value >= 0.0 && self.max_value > 1.0 {
            // AP0 encloses the spectral locus, so HDR data never needs negatives
            (ColorSpace::Aces, false)
        } else {
            (ColorSpace::Rec709, true)
        }
    }
}

fn negative_pixel_fraction(samples: &SampleSet) -> f64 {
    let pixels = samples.pixel_count();
    if pixels == 0 {
        return 0.0;
    }
    let channels: Vec<&[f32]> = samples.color_channels().map(|(_, s)| s).collect();
    let negative = (0..pixels)
        .filter(|i| channels.iter().any(|c| c[*i] <= NEGATIVE_EPSILON))
        .count();
    negative as f64 / pixels as f64
}

fn normalized_entropy(stops: &BTreeMap<i32, usize>) -> f64 {
    let (Some(lo), Some(hi)) = (stops.keys().next(), stops.keys().next_back()) else {
        return 0.0;
    };
    let bins = (hi - lo + 1) as usize;
    if bins < 2 {
        return 0.0;
    }
    let total: usize = stops.values().sum();
    let entropy: f64 = stops
        .values()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    entropy / (bins as f64).ln()
}

/// One classification heuristic. Rules are evaluated in [`ClassificationRule::ORDER`]
/// and the first match wins; base confidence strictly decreases along that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationRule {
    DeclaredTag,
    Chromaticities,
    DistributionShape,
    GamutExtents,
}

impl ClassificationRule {
    pub const ORDER: [ClassificationRule; 4] = [
        ClassificationRule::DeclaredTag,
        ClassificationRule::Chromaticities,
        ClassificationRule::DistributionShape,
        ClassificationRule::GamutExtents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassificationRule::DeclaredTag => "DeclaredTag",
            ClassificationRule::Chromaticities => "Chromaticities",
            ClassificationRule::DistributionShape => "DistributionShape",
            ClassificationRule::GamutExtents => "GamutExtents",
        }
    }

    /// Highest confidence the rule can report.
    pub fn confidence(&self) -> f32 {
        match self {
            ClassificationRule::DeclaredTag => 0.95,
            ClassificationRule::Chromaticities => 0.85,
            ClassificationRule::DistributionShape => 0.55,
            ClassificationRule::GamutExtents => 0.25,
        }
    }

    /// Lowest confidence the rule can report.
    pub fn floor_confidence(&self) -> f32 {
        match self {
            ClassificationRule::Chromaticities => 0.70,
            ClassificationRule::GamutExtents => 0.15,
            other => other.confidence(),
        }
    }

    pub fn evaluate(&self, context: &ClassificationContext) -> Option<ColorEncodingInfo> {
        match self {
            ClassificationRule::DeclaredTag => self.declared_tag(context),
            ClassificationRule::Chromaticities => self.chromaticities(context),
            ClassificationRule::DistributionShape => self.distribution_shape(context),
            ClassificationRule::GamutExtents => self.gamut_extents(context),
        }
    }

    fn matched(&self, color_space: ColorSpace, encoding: Encoding, confidence: f32) -> ColorEncodingInfo {
        ColorEncodingInfo {
            color_space,
            encoding,
            confidence,
            rule: Some(*self),
            approximate: false,
            detail: None,
        }
    }

    fn declared_tag(&self, context: &ClassificationContext) -> Option<ColorEncodingInfo> {
        let tag = context.declared_tag.as_deref()?;
        let (color_space, encoding) = parse_color_tag(tag);
        let color_space = color_space?;
        let encoding = encoding
            .or_else(|| context.distribution_encoding())
            .unwrap_or(Encoding::Unknown);

        let mut info = self.matched(color_space, encoding, self.confidence());
        info.detail = Some(tag.to_string());
        Some(info)
    }

    fn chromaticities(&self, context: &ClassificationContext) -> Option<ColorEncodingInfo> {
        let chromaticities = context.chromaticities.as_ref()?;
        let (known, distance) = primaries::nearest(chromaticities);
        let approximate = if distance < EXACT_MATCH_DISTANCE {
            false
        } else if distance < APPROXIMATE_MATCH_DISTANCE {
            true
        } else {
            return None;
        };

        let encoding = context
            .distribution_encoding()
            .unwrap_or(Encoding::Unknown);
        let confidence = if approximate {
            self.floor_confidence()
        } else {
            self.confidence()
        };

        let mut info = self.matched(known.color_space, encoding, confidence);
        info.approximate = approximate;
        info.detail = Some(known.name.to_string());
        Some(info)
    }

    fn distribution_shape(&self, context: &ClassificationContext) -> Option<ColorEncodingInfo> {
        let encoding = context.distribution_encoding()?;
        let (color_space, _) = context.gamut_from_extents();
        Some(self.matched(color_space, encoding, self.confidence()))
    }

    fn gamut_extents(&self, context: &ClassificationContext) -> Option<ColorEncodingInfo> {
        let (color_space, ambiguous) = context.gamut_from_extents();
        let confidence = if ambiguous {
            self.floor_confidence()
        } else {
            self.confidence()
        };
        Some(self.matched(color_space, Encoding::Unknown, confidence))
    }
}

/// Reads a free-form color tag ("ACEScg", "Rec.709", "ARRI LogC / P3"...).
pub fn parse_color_tag(tag: &str) -> (Option<ColorSpace>, Option<Encoding>) {
    let normalized: String = tag
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    let color_space = if normalized.contains("aces")
        || normalized.contains("ap0")
        || normalized.contains("ap1")
    {
        Some(ColorSpace::Aces)
    } else if normalized.contains("2020") {
        Some(ColorSpace::Rec2020)
    } else if normalized.contains("p3") || normalized.contains("dci") {
        Some(ColorSpace::DciP3)
    } else if normalized.contains("709") || normalized.contains("srgb") {
        Some(ColorSpace::Rec709)
    } else {
        None
    };

    let encoding = if normalized.contains("log") || normalized.contains("acescc") {
        Some(Encoding::Log)
    } else if normalized.contains("lin") || normalized.contains("acescg") {
        Some(Encoding::Linear)
    } else {
        None
    };

    (color_space, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ClassificationContext {
        ClassificationContext {
            declared_tag: None,
            chromaticities: None,
            average_mean: 0.4,
            average_max: 1.0,
            min_value: 0.0,
            max_value: 1.0,
            negative_pixel_fraction: 0.0,
            log_uniformity: 0.0,
        }
    }

    #[test]
    fn confidence_strictly_decreases_along_rule_order() {
        for pair in ClassificationRule::ORDER.windows(2) {
            assert!(
                pair[0].floor_confidence() > pair[1].confidence(),
                "{} must outrank {}",
                pair[0].name(),
                pair[1].name()
            );
            assert!(pair[0].confidence() >= pair[0].floor_confidence());
        }
    }

    #[test]
    fn parses_common_tags() {
        assert_eq!(
            parse_color_tag("ACEScg"),
            (Some(ColorSpace::Aces), Some(Encoding::Linear))
        );
        assert_eq!(
            parse_color_tag("ACEScct"),
            (Some(ColorSpace::Aces), Some(Encoding::Log))
        );
        assert_eq!(parse_color_tag("Rec. 709"), (Some(ColorSpace::Rec709), None));
        assert_eq!(parse_color_tag("ITU-R BT.2020"), (Some(ColorSpace::Rec2020), None));
        assert_eq!(
            parse_color_tag("LogC / DCI-P3"),
            (Some(ColorSpace::DciP3), Some(Encoding::Log))
        );
        assert_eq!(parse_color_tag("mystery"), (None, None));
    }

    #[test]
    fn distribution_thresholds() {
        let mut ctx = context();
        ctx.average_max = 12.0;
        ctx.average_mean = 0.8;
        assert_eq!(ctx.distribution_encoding(), Some(Encoding::Linear));

        ctx.average_max = 1.2;
        ctx.average_mean = 0.4;
        assert_eq!(ctx.distribution_encoding(), Some(Encoding::Log));

        ctx.average_max = 1.0;
        ctx.average_mean = 0.1;
        assert_eq!(ctx.distribution_encoding(), Some(Encoding::Linear));

        ctx.average_max = 1.3;
        ctx.average_mean = 0.1;
        assert_eq!(ctx.distribution_encoding(), None);
        ctx.log_uniformity = 0.9;
        assert_eq!(ctx.distribution_encoding(), Some(Encoding::Log));
    }

    #[test]
    fn gamut_from_extents() {
        let mut ctx = context();
        assert_eq!(ctx.gamut_from_extents(), (ColorSpace::Rec709, true));
        ctx.max_value = 40.0;
        assert_eq!(ctx.gamut_from_extents(), (ColorSpace::Aces, false));
        ctx.min_value = -0.3;
        ctx.negative_pixel_fraction = 0.02;
        assert_eq!(ctx.gamut_from_extents(), (ColorSpace::Rec709, false));
    }

    #[test]
    fn unrecognized_tag_does_not_match() {
        let mut ctx = context();
        ctx.declared_tag = Some("custom".to_string());
        assert_eq!(ClassificationRule::DeclaredTag.evaluate(&ctx), None);
    }

    #[test]
    fn normalized_entropy_bounds() {
        let stops = |pairs: &[(i32, usize)]| pairs.iter().copied().collect::<BTreeMap<_, _>>();
        assert_eq!(normalized_entropy(&stops(&[])), 0.0);
        assert_eq!(normalized_entropy(&stops(&[(3, 3)])), 0.0);
        let uniform = normalized_entropy(&stops(&[(-4, 1), (-3, 1), (-2, 1), (-1, 1)]));
        assert!((uniform - 1.0).abs() < 1e-12);
    }
}

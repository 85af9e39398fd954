use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::color::ColorEncodingInfo;
use super::histogram::HistogramData;
use super::quality::QualityMetrics;
use super::viewport::{ViewportBounds, ViewportRange};
use super::waveform::WaveformData;
use crate::common::{SampleSet, SourceMetadata};

/// Everything computed for one loaded file. Built once, then shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub source: SourceMetadata,
    pub quality: QualityMetrics,
    pub color: ColorEncodingInfo,
    pub histogram: HistogramData,
    pub waveform: WaveformData,
    pub histogram_view: ViewportBounds,
    pub waveform_view: ViewportBounds,
}

impl AnalysisReport {
    pub fn assemble(
        samples: &SampleSet,
        quality: QualityMetrics,
        color: ColorEncodingInfo,
        histogram: HistogramData,
        waveform: WaveformData,
    ) -> Self {
        let (value_min, value_max) = (quality.min_value as f64, quality.max_value as f64);

        let (hist_lo, hist_hi) = histogram.value_extent().unwrap_or((value_min, value_max));
        let histogram_view = ViewportBounds::new(
            ViewportRange::recover(hist_lo, hist_hi),
            ViewportRange::recover(0.0, histogram.display_cap_count as f64),
        );

        let (wave_lo, wave_hi) = waveform
            .value_extent()
            .map(|(lo, hi)| (lo as f64, hi as f64))
            .unwrap_or((value_min, value_max));
        let last_column = samples.width().saturating_sub(1) as f64;
        let waveform_view = ViewportBounds::new(
            ViewportRange::recover(0.0, last_column),
            ViewportRange::recover(wave_lo, wave_hi),
        );

        Self {
            id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            width: samples.width(),
            height: samples.height(),
            source: samples.metadata().clone(),
            quality,
            color,
            histogram,
            waveform,
            histogram_view,
            waveform_view,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn display_name(&self) -> &str {
        self.source.file_name.as_deref().unwrap_or("<unnamed>")
    }
}

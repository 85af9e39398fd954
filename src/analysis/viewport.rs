use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalysisError;

/// Padding added on both sides of the data extent, as a fraction of the span.
pub const VIEWPORT_PADDING: f64 = 0.1;

/// Half-width of the span synthesized for constant data.
pub const CONSTANT_DATA_HALF_SPAN: f64 = 0.5;

/// Minimum width of a clamped window, as a fraction of the allowed span.
const MIN_WINDOW_FRACTION: f64 = 0.01;

/// Zoom/pan limits for one axis of a histogram or waveform view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRange {
    pub data_min: f64,
    pub data_max: f64,
    pub allowed_min: f64,
    pub allowed_max: f64,
}

/// Computes the allowed zoom/pan range for a data extent (data ± 10% of the span).
///
/// Constant data gets a synthesized span of ±0.5 around the value so zooming has room.
pub fn compute_allowed_range(data_min: f64, data_max: f64) -> Result<ViewportRange, AnalysisError> {
    if !data_min.is_finite() || !data_max.is_finite() || data_max < data_min {
        return Err(AnalysisError::DegenerateRange {
            min: data_min,
            max: data_max,
        });
    }

    let span = data_max - data_min;
    let (allowed_min, allowed_max) = if span == 0.0 {
        (
            data_min - CONSTANT_DATA_HALF_SPAN,
            data_max + CONSTANT_DATA_HALF_SPAN,
        )
    } else {
        (
            data_min - VIEWPORT_PADDING * span,
            data_max + VIEWPORT_PADDING * span,
        )
    };

    Ok(ViewportRange {
        data_min,
        data_max,
        allowed_min,
        allowed_max,
    })
}

impl ViewportRange {
    /// Like [`compute_allowed_range`] but never fails: inverted extents are swapped and
    /// non-finite ones fall back to the unit range.
    pub fn recover(data_min: f64, data_max: f64) -> Self {
        match compute_allowed_range(data_min, data_max) {
            Ok(range) => range,
            Err(e) => {
                debug!("Recovering viewport range: {}", e);
                let (lo, hi) = match (data_min.is_finite(), data_max.is_finite()) {
                    (true, true) => (data_min.min(data_max), data_min.max(data_max)),
                    (true, false) => (data_min, data_min),
                    (false, true) => (data_max, data_max),
                    (false, false) => (0.0, 1.0),
                };
                compute_allowed_range(lo, hi).unwrap_or(Self::unit())
            }
        }
    }

    fn unit() -> Self {
        Self {
            data_min: 0.0,
            data_max: 1.0,
            allowed_min: -VIEWPORT_PADDING,
            allowed_max: 1.0 + VIEWPORT_PADDING,
        }
    }

    pub fn allowed_span(&self) -> f64 {
        self.allowed_max - self.allowed_min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.allowed_min && value <= self.allowed_max
    }

    /// Clamps a requested `[lo, hi]` window into the allowed range.
    ///
    /// A window that collapses after clamping is widened by 1% of the allowed span,
    /// staying inside the allowed range.
    pub fn clamp_window(&self, lo: f64, hi: f64) -> (f64, f64) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let clamp = |v: f64| {
            if v.is_nan() {
                self.allowed_min
            } else {
                v.clamp(self.allowed_min, self.allowed_max)
            }
        };
        let (mut lo, mut hi) = (clamp(lo), clamp(hi));

        if lo == hi {
            let min_width = self.allowed_span() * MIN_WINDOW_FRACTION;
            if hi + min_width <= self.allowed_max {
                hi += min_width;
            } else {
                lo -= min_width;
            }
        }
        (lo, hi)
    }
}

/// A requested visible window on a 2-D view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewWindow {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Allowed ranges for both axes of a histogram or waveform view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub x: ViewportRange,
    pub y: ViewportRange,
}

impl ViewportBounds {
    pub fn new(x: ViewportRange, y: ViewportRange) -> Self {
        Self { x, y }
    }

    /// Every zoom/pan request from the presentation layer goes through here.
    pub fn clamp(&self, window: ViewWindow) -> ViewWindow {
        let (x_min, x_max) = self.x.clamp_window(window.x_min, window.x_max);
        let (y_min, y_max) = self.y.clamp_window(window.y_min, window.y_max);
        ViewWindow {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// The unpadded data extent, used when resetting a view.
    pub fn default_window(&self) -> ViewWindow {
        let x = self.x.clamp_window(self.x.data_min, self.x.data_max);
        let y = self.y.clamp_window(self.y.data_min, self.y.data_max);
        ViewWindow {
            x_min: x.0,
            x_max: x.1,
            y_min: y.0,
            y_max: y.1,
        }
    }
}

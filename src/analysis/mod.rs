pub mod color;
pub mod comparison;
pub mod histogram;
pub mod quality;
pub mod report;
pub mod viewport;
pub mod waveform;

pub use color::{ColorEncodingClassifier, ColorEncodingInfo, ColorSpace, Encoding};
pub use comparison::{compare, ComparisonResult, Verdict};
pub use histogram::{HistogramBuilder, HistogramData, HistogramOptions};
pub use quality::{QualityAnalyzer, QualityMetrics, StarRating};
pub use report::AnalysisReport;
pub use viewport::{compute_allowed_range, ViewWindow, ViewportBounds, ViewportRange};
pub use waveform::{WaveformBuilder, WaveformData, WaveformMode, WaveformOptions};

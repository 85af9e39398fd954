pub mod summary;

pub use summary::{ComparisonSummary, ReportSummary};

use std::fmt;

use crate::analysis::{AnalysisReport, ComparisonResult, Verdict};

const MEGABYTE: f64 = 1024.0 * 1024.0;

fn size_label(bytes: Option<u64>) -> String {
    bytes
        .map(|b| format!("{:.1} MB", b as f64 / MEGABYTE))
        .unwrap_or_else(|| "-".to_string())
}

fn step_label(report: &AnalysisReport) -> String {
    report
        .quality
        .average_step_ratio()
        .map(|ratio| format!("{:.1}x finer than 8-bit", ratio))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Plain-text rendering of one report, grouped the way a colorist reads it.
pub struct ReportSummary<'a>(pub &'a AnalysisReport);

impl fmt::Display for ReportSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let quality = &report.quality;
        let source = &report.source;

        writeln!(f, "FILE INFO")?;
        writeln!(f, "  Filename      {}", report.display_name())?;
        writeln!(f, "  Resolution    {} x {}", report.width, report.height)?;
        writeln!(f, "  File Size     {}", size_label(source.file_size))?;
        writeln!(f, "  Native Type   {}", source.native_type().unwrap_or("-"))?;
        writeln!(f, "  Compression   {}", source.compression.as_deref().unwrap_or("-"))?;
        writeln!(
            f,
            "  Color Space   {} ({:.0}% confidence)",
            report.color.color_space_label(),
            report.color.confidence * 100.0
        )?;
        writeln!(f, "  Encoding      {}", report.color.encoding)?;
        writeln!(f)?;

        writeln!(f, "QUALITY METRICS")?;
        writeln!(
            f,
            "  Range         {:.3} - {:.3}",
            quality.min_value, quality.max_value
        )?;
        writeln!(f, "  Above 1.0     {:.1}%", quality.fraction_above_one * 100.0)?;
        writeln!(f, "  Unique Values {}", quality.unique_value_count)?;
        writeln!(f, "  Midtone Step  {}", step_label(report))?;
        writeln!(f, "  Effective Bits ~{:.1}", quality.effective_bits)?;
        writeln!(
            f,
            "  Quality       {} {}",
            quality.star_rating.glyphs(),
            quality.grade().label()
        )?;
        writeln!(f)?;

        writeln!(f, "CHANNEL ANALYSIS")?;
        writeln!(
            f,
            "  {:<8}{:>12}{:>12}{:>12}{:>10}",
            "Channel", "Min", "Max", "Mean", "Unique"
        )?;
        for (channel, stats) in &quality.channels {
            writeln!(
                f,
                "  {:<8}{:>12.4}{:>12.4}{:>12.4}{:>10}",
                channel, stats.min, stats.max, stats.mean, stats.unique_value_count
            )?;
        }
        Ok(())
    }
}

/// Side-by-side table of two reports plus the verdict line.
pub struct ComparisonSummary<'a> {
    pub a: &'a AnalysisReport,
    pub b: &'a AnalysisReport,
    pub result: &'a ComparisonResult,
}

impl fmt::Display for ComparisonSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = (self.a, self.b);
        let rows = [
            ("Filename", a.display_name().to_string(), b.display_name().to_string()),
            ("File Size", size_label(a.source.file_size), size_label(b.source.file_size)),
            (
                "Compression",
                a.source.compression.clone().unwrap_or_else(|| "-".to_string()),
                b.source.compression.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "Range",
                format!("{:.3} - {:.3}", a.quality.min_value, a.quality.max_value),
                format!("{:.3} - {:.3}", b.quality.min_value, b.quality.max_value),
            ),
            (
                "Above 1.0",
                format!("{:.1}%", a.quality.fraction_above_one * 100.0),
                format!("{:.1}%", b.quality.fraction_above_one * 100.0),
            ),
            (
                "Unique Values",
                a.quality.unique_value_count.to_string(),
                b.quality.unique_value_count.to_string(),
            ),
            ("Midtone Step", step_label(a), step_label(b)),
            (
                "Effective Bits",
                format!("~{:.1}", a.quality.effective_bits),
                format!("~{:.1}", b.quality.effective_bits),
            ),
            ("Color Space", a.color.color_space_label(), b.color.color_space_label()),
            ("Encoding", a.color.encoding.to_string(), b.color.encoding.to_string()),
        ];

        writeln!(f, "COMPARISON")?;
        writeln!(f, "  {:<16}{:<26}{:<26}", "Metric", "File 1", "File 2")?;
        for (label, left, right) in rows {
            writeln!(f, "  {:<16}{:<26}{:<26}", label, left, right)?;
        }
        if !self.result.dimensions_match {
            writeln!(
                f,
                "  Warning: dimensions differ ({}x{} vs {}x{})",
                self.result.dimensions_a.0,
                self.result.dimensions_a.1,
                self.result.dimensions_b.0,
                self.result.dimensions_b.1
            )?;
        }

        let bits = self.result.effective_bits_delta.abs();
        match self.result.verdict {
            Verdict::First => writeln!(f, "Comparison: File 1 has ~{:.1} more effective bits", bits),
            Verdict::Second => writeln!(f, "Comparison: File 2 has ~{:.1} more effective bits", bits),
            Verdict::Equivalent => writeln!(f, "Comparison: {}", Verdict::Equivalent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compare;
    use crate::common::{Channel, SampleSet};
    use crate::pipeline::AnalysisService;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn report(levels: usize) -> AnalysisReport {
        let values: Vec<f32> = (0..4096).map(|i| (i % levels) as f32 / levels as f32).collect();
        let samples = SampleSet::new(
            64,
            64,
            [
                (Channel::R, values.clone()),
                (Channel::G, values.clone()),
                (Channel::B, values),
            ],
        )
        .unwrap();
        AnalysisService::default()
            .oneshot(Arc::new(samples))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn report_summary_lists_sections_and_channels() {
        let report = report(4000).await;
        let text = ReportSummary(&report).to_string();
        assert!(text.contains("QUALITY METRICS"));
        assert!(text.contains("Unique Values 4000"));
        assert!(text.contains("Good"));
        let channel_rows = text
            .lines()
            .filter(|line| ["R ", "G ", "B "].iter().any(|c| line.trim_start().starts_with(c)))
            .count();
        assert_eq!(channel_rows, 3);
    }

    #[tokio::test]
    async fn comparison_summary_names_the_richer_file() {
        let (a, b) = (report(4000).await, report(256).await);
        let result = compare(&a, &b);
        let text = ComparisonSummary {
            a: &a,
            b: &b,
            result: &result,
        }
        .to_string();
        assert!(text.contains("File 1 has ~"));
        assert!(!text.contains("Warning"));
    }
}

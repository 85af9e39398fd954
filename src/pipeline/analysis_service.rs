use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures::Future;
use futures::task::Context;
use futures::task::Poll;
use tokio::task::JoinHandle;
use tower::Service;
use tracing::{debug, info};

use crate::analysis::{
    AnalysisReport, ColorEncodingClassifier, HistogramBuilder, QualityAnalyzer, WaveformBuilder,
};
use crate::common::SampleSet;
use crate::config::Configuration;
use crate::error::{AnalysisError, AppError};

/// Runs the four analyzers concurrently on the blocking pool and joins them into one report.
///
/// Either every analyzer succeeds and a complete report is returned, or the first error
/// is returned and nothing is produced.
#[derive(Clone, Default)]
pub struct AnalysisService {
    quality: Arc<QualityAnalyzer>,
    classifier: Arc<ColorEncodingClassifier>,
    histogram: Arc<HistogramBuilder>,
    waveform: Arc<WaveformBuilder>,
}

impl AnalysisService {
    pub fn new(
        quality: QualityAnalyzer,
        classifier: ColorEncodingClassifier,
        histogram: HistogramBuilder,
        waveform: WaveformBuilder,
    ) -> Self {
        Self {
            quality: Arc::new(quality),
            classifier: Arc::new(classifier),
            histogram: Arc::new(histogram),
            waveform: Arc::new(waveform),
        }
    }

    pub fn from_configuration(configuration: &Configuration) -> Result<Self, AppError> {
        configuration.validate().map_err(AppError::Config)?;
        Ok(Self::new(
            QualityAnalyzer::new(),
            ColorEncodingClassifier::new(),
            HistogramBuilder::new(configuration.histogram_options()),
            WaveformBuilder::new(configuration.waveform_options()),
        ))
    }
}

async fn joined<T>(handle: JoinHandle<Result<T, AnalysisError>>) -> Result<T, AppError> {
    Ok(handle.await??)
}

impl Service<Arc<SampleSet>> for AnalysisService {
    type Response = AnalysisReport;
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, samples: Arc<SampleSet>) -> Self::Future {
        let quality = self.quality.clone();
        let classifier = self.classifier.clone();
        let histogram = self.histogram.clone();
        let waveform = self.waveform.clone();

        Box::pin(async move {
            let start = Instant::now();
            samples.ensure_non_empty()?;

            let quality_task = tokio::task::spawn_blocking({
                let samples = samples.clone();
                move || quality.analyze(&samples)
            });
            let color_task = tokio::task::spawn_blocking({
                let samples = samples.clone();
                move || Ok::<_, AnalysisError>(classifier.classify(&samples))
            });
            let histogram_task = tokio::task::spawn_blocking({
                let samples = samples.clone();
                move || histogram.build(&samples)
            });
            let waveform_task = tokio::task::spawn_blocking({
                let samples = samples.clone();
                move || waveform.build(&samples)
            });

            let (quality, color, histogram, waveform) = tokio::try_join!(
                joined(quality_task),
                joined(color_task),
                joined(histogram_task),
                joined(waveform_task),
            )?;
            debug!("Analyzers joined in {}us", start.elapsed().as_micros());

            let report = AnalysisReport::assemble(&samples, quality, color, histogram, waveform);
            info!(
                "Analyzed {}x{}: {:.1} effective bits, {} / {}, in {}us",
                report.width,
                report.height,
                report.quality.effective_bits,
                report.color.color_space_label(),
                report.color.encoding,
                start.elapsed().as_micros()
            );
            Ok(report)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ColorSpace, WaveformMode};
    use crate::common::Channel;
    use tower::ServiceExt;

    fn gradient(width: u32, height: u32) -> Arc<SampleSet> {
        let n = (width * height) as usize;
        let values: Vec<f32> = (0..n).map(|i| i as f32 / n as f32 * 4.0).collect();
        Arc::new(
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
            .with_declared_color_tag("ACEScg"),
        )
    }

    #[tokio::test]
    async fn test_analysis_service() {
        let mut service = AnalysisService::default();
        let report = service.call(gradient(64, 16)).await.unwrap();

        assert_eq!(report.dimensions(), (64, 16));
        assert_eq!(report.quality.unique_value_count, 1024);
        assert_eq!(report.color.color_space, ColorSpace::Aces);
        assert_eq!(report.waveform.mode(), WaveformMode::Envelope);
        for histogram in report.histogram.channels.values() {
            assert_eq!(histogram.total(), 1024);
        }
        assert!(report.histogram_view.x.allowed_min < 0.0);
    }

    #[tokio::test]
    async fn empty_image_aborts_whole_report() {
        let empty = Arc::new(SampleSet::new(0, 0, [(Channel::R, Vec::new())]).unwrap());
        let result = AnalysisService::default().oneshot(empty).await;
        assert!(matches!(
            result,
            Err(AppError::Analysis(AnalysisError::EmptyInput(_)))
        ));
    }

    #[tokio::test]
    async fn non_finite_image_still_produces_report() {
        let overflow = Arc::new(
            SampleSet::new(
                2,
                2,
                [
                    (Channel::R, vec![f32::NAN; 4]),
                    (Channel::G, vec![f32::INFINITY; 4]),
                    (Channel::B, vec![f32::NEG_INFINITY; 4]),
                ],
            )
            .unwrap(),
        );
        let report = AnalysisService::default().oneshot(overflow).await.unwrap();

        assert_eq!(report.quality.unique_value_count, 0);
        assert_eq!(report.quality.star_rating.stars(), 1);
        assert!(report.quality.min_value.is_nan());
        assert!(report.histogram_view.x.allowed_span().is_finite());
        assert!(report.waveform_view.y.allowed_span().is_finite());
    }

    #[tokio::test]
    async fn configuration_drives_builders() {
        let configuration = Configuration::default()
            .with_bin_count(16)
            .with_waveform_mode(WaveformMode::FullSpectrum);
        let service = AnalysisService::from_configuration(&configuration).unwrap();
        let report = service.oneshot(gradient(32, 8)).await.unwrap();

        assert_eq!(report.histogram.bin_count, 16);
        assert_eq!(report.waveform.mode(), WaveformMode::FullSpectrum);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let result = AnalysisService::from_configuration(&Configuration::default().with_bin_count(0));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}

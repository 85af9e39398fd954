use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use super::analysis_service::AnalysisService;
use super::sequencer::{LoadSequencer, LoadToken};
use crate::analysis::{compare, AnalysisReport, ComparisonResult};
use crate::common::SampleSet;
use crate::decode::ImageDecoder;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Primary,
    Comparison,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Primary => "primary",
            Slot::Comparison => "comparison",
        })
    }
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Committed(Arc<AnalysisReport>),
    /// A newer load for the same slot started first; this result was dropped.
    Superseded,
}

impl LoadOutcome {
    pub fn report(&self) -> Option<&Arc<AnalysisReport>> {
        match self {
            LoadOutcome::Committed(report) => Some(report),
            LoadOutcome::Superseded => None,
        }
    }
}

#[derive(Default)]
struct ReportSlot {
    sequencer: LoadSequencer,
    report: RwLock<Option<Arc<AnalysisReport>>>,
}

/// Primary and comparison reports for one interactive session.
///
/// Reports are immutable snapshots. Each slot commits only the result of its most recently
/// started load, so a slow earlier load can never overwrite a newer one.
pub struct AnalysisSession {
    decoder: Arc<dyn ImageDecoder>,
    service: AnalysisService,
    primary: ReportSlot,
    comparison: ReportSlot,
}

impl AnalysisSession {
    pub fn new(decoder: Arc<dyn ImageDecoder>, service: AnalysisService) -> Self {
        Self {
            decoder,
            service,
            primary: ReportSlot::default(),
            comparison: ReportSlot::default(),
        }
    }

    fn slot(&self, slot: Slot) -> &ReportSlot {
        match slot {
            Slot::Primary => &self.primary,
            Slot::Comparison => &self.comparison,
        }
    }

    /// Decodes and analyzes `path`, then commits the report if no newer load has started.
    pub async fn load(&self, slot: Slot, path: &Path) -> Result<LoadOutcome, AppError> {
        let token = self.slot(slot).sequencer.begin();
        let start = Instant::now();
        info!("Loading {} into {} slot (load {})", path.display(), slot, token.sequence());

        let result = match self.decoder.decode(path).await {
            Ok(samples) => self.service.clone().oneshot(Arc::new(samples)).await,
            Err(e) => Err(e.into()),
        };
        let outcome = self.commit(slot, token, result).await;
        debug!("{} slot load finished in {}us", slot, start.elapsed().as_micros());
        outcome
    }

    /// Same as [`load`](Self::load) for samples that are already decoded.
    pub async fn load_samples(&self, slot: Slot, samples: SampleSet) -> Result<LoadOutcome, AppError> {
        let token = self.slot(slot).sequencer.begin();
        let result = self.service.clone().oneshot(Arc::new(samples)).await;
        self.commit(slot, token, result).await
    }

    async fn commit(
        &self,
        slot: Slot,
        token: LoadToken,
        result: Result<AnalysisReport, AppError>,
    ) -> Result<LoadOutcome, AppError> {
        let target = self.slot(slot);
        let mut current = target.report.write().await;

        if !target.sequencer.is_latest(token) {
            match &result {
                Ok(report) => debug!("Discarding stale report {} for {} slot", report.id, slot),
                Err(e) => debug!("Discarding stale failure for {} slot: {}", slot, e),
            }
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(report) => {
                let report = Arc::new(report);
                *current = Some(report.clone());
                Ok(LoadOutcome::Committed(report))
            }
            Err(e) => {
                warn!("Load into {} slot failed, keeping previous report: {}", slot, e);
                Err(e)
            }
        }
    }

    /// Installs a finished report, superseding any load in flight. Returns the previous one.
    pub async fn replace(
        &self,
        slot: Slot,
        report: Arc<AnalysisReport>,
    ) -> Option<Arc<AnalysisReport>> {
        let target = self.slot(slot);
        let mut current = target.report.write().await;
        target.sequencer.begin();
        current.replace(report)
    }

    /// Empties the slot and invalidates any load still in flight for it.
    pub async fn clear(&self, slot: Slot) {
        let target = self.slot(slot);
        let mut current = target.report.write().await;
        target.sequencer.begin();
        *current = None;
    }

    pub async fn report(&self, slot: Slot) -> Option<Arc<AnalysisReport>> {
        self.slot(slot).report.read().await.clone()
    }

    /// None until both slots hold a report.
    pub async fn compare(&self) -> Option<ComparisonResult> {
        let primary = self.report(Slot::Primary).await?;
        let comparison = self.report(Slot::Comparison).await?;
        Some(compare(&primary, &comparison))
    }
}

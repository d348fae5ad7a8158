//! One user's working set of pages and their anomaly flags.
//!
//! Each call to [`ConversionSession::convert`] starts a new generation.
//! Probe tasks carry the generation they were launched for, and anything
//! that arrives tagged with an older generation is dropped.

use crate::error::{PagerError, Result};
use crate::services::paginator::ArticlePaginator;
use crate::services::prober::AnomalyDetector;
use crate::types::{AnomalyResult, Page};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

struct ProbeOutcome {
    generation: u64,
    index: usize,
    result: AnomalyResult,
}

pub struct ConversionSession {
    detector: Option<Arc<dyn AnomalyDetector>>,
    generation: u64,
    pages: Vec<Page>,
    anomalies: Vec<AnomalyResult>,
    probes: JoinSet<ProbeOutcome>,
}

impl ConversionSession {
    /// Without a detector, pages are never probed and every anomaly result
    /// stays empty.
    pub fn new(detector: Option<Arc<dyn AnomalyDetector>>) -> Self {
        Self {
            detector,
            generation: 0,
            pages: Vec::new(),
            anomalies: Vec::new(),
            probes: JoinSet::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn anomalies(&self) -> &[AnomalyResult] {
        &self.anomalies
    }

    /// Re-paginate from scratch and launch one probe per page.
    ///
    /// With a detector configured this needs a Tokio runtime to spawn the
    /// probes on; outside one it returns [`PagerError::Runtime`] and leaves
    /// the previous pages untouched.
    pub fn convert(&mut self, article: &str, prompt: &str, max_tokens: usize) -> Result<&[Page]> {
        let paginator = ArticlePaginator::new(max_tokens)?;
        let runtime = match &self.detector {
            Some(_) => Some(Handle::try_current().map_err(|e| PagerError::Runtime {
                reason: format!("Anomaly probes need a Tokio runtime: {}", e),
            })?),
            None => None,
        };
        let pages = paginator.paginate(article, prompt);

        self.generation += 1;
        self.probes.abort_all();
        self.anomalies = vec![AnomalyResult::none(); pages.len()];
        self.pages = pages;

        info!(
            "Generation {}: {} pages at {} tokens per page",
            self.generation,
            self.pages.len(),
            paginator.max_tokens()
        );

        if let (Some(detector), Some(runtime)) = (&self.detector, &runtime) {
            for page in &self.pages {
                let detector = Arc::clone(detector);
                let generation = self.generation;
                let index = page.number - 1;
                let text = page.content.clone();

                let task = async move {
                    let result = match detector.detect(&text).await {
                        Ok(result) => result,
                        Err(e) => {
                            warn!(
                                "Anomaly probe for page {} failed, showing no warning: {}",
                                index + 1,
                                e
                            );
                            AnomalyResult::none()
                        }
                    };
                    ProbeOutcome {
                        generation,
                        index,
                        result,
                    }
                };
                self.probes.spawn_on(task, runtime);
            }
            debug!("Launched {} anomaly probes", self.pages.len());
        }

        Ok(&self.pages)
    }

    /// Wait for every in-flight probe and record the current generation's
    /// results.
    pub async fn collect_anomalies(&mut self) -> &[AnomalyResult] {
        while let Some(joined) = self.probes.join_next().await {
            match joined {
                Ok(outcome) if outcome.generation == self.generation => {
                    if let Some(slot) = self.anomalies.get_mut(outcome.index) {
                        *slot = outcome.result;
                    }
                }
                Ok(outcome) => {
                    debug!(
                        "Discarding stale probe result for page {} from generation {}",
                        outcome.index + 1,
                        outcome.generation
                    );
                }
                Err(e) if e.is_cancelled() => debug!("Probe task cancelled"),
                Err(e) => warn!("Probe task failed, showing no warning: {}", e),
            }
        }

        &self.anomalies
    }

    pub fn page_text(&self, number: usize) -> Result<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .map(Page::as_str)
            .ok_or(PagerError::PageNotFound {
                number,
                total: self.pages.len(),
            })
    }

    /// Replace one page's text. Nothing else is recomputed.
    pub fn edit_page(&mut self, number: usize, text: impl Into<String>) -> Result<()> {
        let total = self.pages.len();
        let page = number
            .checked_sub(1)
            .and_then(|idx| self.pages.get_mut(idx))
            .ok_or(PagerError::PageNotFound { number, total })?;

        page.content = text.into();
        debug!("Page {} edited", number);
        Ok(())
    }
}

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::{
    config::Config,
    enrich::{EnrichedItem, EnrichmentPipeline, PipelineOptions, RecommendationSidecar},
    providers::{AvailabilityProvider, DetailProvider},
    semantic::{embed, Corpus, ScoredItem},
};

/// Enriched results of one request plus the optional recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Enrichment {
    pub items: Vec<EnrichedItem>,
    pub recommendation: Option<EnrichedItem>,
}

/// Caller-facing facade: ranks the corpus and enriches the results.
pub struct CatalogService {
    corpus: Arc<Corpus>,
    pipeline: EnrichmentPipeline,
    sidecar: Option<RecommendationSidecar>,
    default_page_size: usize,
    default_deadline: Duration,
}

impl CatalogService {
    pub fn new(
        corpus: Arc<Corpus>,
        details: Arc<dyn DetailProvider>,
        availability: Arc<dyn AvailabilityProvider>,
        config: &Config,
    ) -> Self {
        let enrichment = &config.enrichment;
        let options = PipelineOptions {
            workers: enrichment.workers,
            job_timeout: enrichment.job_timeout(),
            require_availability: enrichment.require_availability,
            pool_max_idle: enrichment.pool_max_idle,
        };

        let sidecar = config.recommendation.enabled.then(|| {
            RecommendationSidecar::new(
                details.clone(),
                availability.clone(),
                config.recommendation.strategy,
                enrichment.job_timeout(),
            )
        });

        Self {
            corpus,
            pipeline: EnrichmentPipeline::new(details, availability, options),
            sidecar,
            default_page_size: config.search.default_page_size,
            default_deadline: enrichment.deadline(),
        }
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub fn default_deadline(&self) -> Duration {
        self.default_deadline
    }

    /// Rank the corpus against `text`, best first.
    pub fn search(&self, text: &str, page_size: usize) -> Vec<ScoredItem> {
        let query = embed(text);
        self.corpus.rank(&query, page_size)
    }

    /// Enrich ranked items within `deadline`.
    ///
    /// The recommendation is picked among the same items and fetched
    /// alongside the pipeline.
    pub async fn enrich(&self, items: &[ScoredItem], deadline: Duration) -> Enrichment {
        if items.is_empty() {
            return Enrichment::default();
        }

        let deadline = Instant::now() + deadline;
        let candidates: Vec<u64> = items.iter().map(|item| item.id).collect();

        let recommend = async {
            match &self.sidecar {
                Some(sidecar) => sidecar.recommend(&candidates, deadline).await,
                None => None,
            }
        };

        let ((items, report), recommendation) =
            tokio::join!(self.pipeline.run(items, deadline), recommend);

        log::debug!("enrichment report: {report:?}");
        if report.failed + report.timed_out > 0 {
            log::info!(
                "{} of {} items dropped ({} failed, {} timed out)",
                report.failed + report.timed_out,
                report.jobs,
                report.failed,
                report.timed_out
            );
        }

        Enrichment {
            items,
            recommendation,
        }
    }

    /// `search` followed by `enrich`.
    pub async fn search_and_enrich(
        &self,
        text: &str,
        page_size: usize,
        deadline: Duration,
    ) -> Enrichment {
        let items = self.search(text, page_size);
        self.enrich(&items, deadline).await
    }

    /// Return the records of a finished response to the enrichment pool.
    pub fn recycle(&self, enrichment: Enrichment) {
        self.pipeline
            .recycle(enrichment.items.into_iter().chain(enrichment.recommendation));
    }
}

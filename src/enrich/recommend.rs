//! Best-effort recommendation of a single candidate.
//!
//! Runs concurrently with the enrichment pipeline and never reports an
//! error: any failed or late lookup simply yields no recommendation.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::EnrichedItem;
use crate::providers::{AvailabilityProvider, DetailProvider, ProviderError};

/// How the recommended id is chosen from the candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStrategy {
    #[default]
    Random,
    First,
}

pub struct RecommendationSidecar {
    details: Arc<dyn DetailProvider>,
    availability: Arc<dyn AvailabilityProvider>,
    strategy: PickStrategy,
    timeout: Duration,
}

impl RecommendationSidecar {
    pub fn new(
        details: Arc<dyn DetailProvider>,
        availability: Arc<dyn AvailabilityProvider>,
        strategy: PickStrategy,
        timeout: Duration,
    ) -> Self {
        Self {
            details,
            availability,
            strategy,
            timeout,
        }
    }

    /// Recommend one in-stock candidate, or nothing.
    ///
    /// Bounded by the lookup timeout and by `deadline`, whichever is sooner.
    /// The returned item carries a score of 0.
    pub async fn recommend(&self, candidates: &[u64], deadline: Instant) -> Option<EnrichedItem> {
        let id = self.pick(candidates)?;
        let budget = self
            .timeout
            .min(deadline.saturating_duration_since(Instant::now()));

        match tokio::time::timeout(budget, self.fetch(id)).await {
            Ok(Ok(Some(item))) => Some(item),
            Ok(Ok(None)) => {
                log::debug!("recommendation {id}: out of stock");
                None
            }
            Ok(Err(err)) => {
                log::debug!("recommendation {id}: {err}");
                None
            }
            Err(_) => {
                log::debug!("recommendation {id}: timed out after {budget:?}");
                None
            }
        }
    }

    fn pick(&self, candidates: &[u64]) -> Option<u64> {
        match self.strategy {
            PickStrategy::First => candidates.first().copied(),
            PickStrategy::Random => candidates.choose(&mut rand::rng()).copied(),
        }
    }

    async fn fetch(&self, id: u64) -> Result<Option<EnrichedItem>, ProviderError> {
        let (detail, availability) =
            tokio::join!(self.details.get(id), self.availability.get(id));
        let detail = detail?;
        let availability = availability?;

        if availability.quantity == 0 {
            return Ok(None);
        }

        Ok(Some(EnrichedItem::from_lookup(
            &detail,
            0.0,
            availability.quantity,
        )))
    }
}

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::providers::{
    Availability, AvailabilityProvider, BoxFuture, Detail, DetailProvider, ProviderError,
};
use crate::semantic::ScoredItem;

mod pipeline;

/// Scriptable detail and stock provider.
///
/// Latency may vary per id. In-flight tracking counts detail lookups only,
/// so one pipeline job counts once.
#[derive(Default)]
pub struct StubProvider {
    latency: Duration,
    /// Extra latency per id step, lets later ids finish sooner or later
    latency_step: Option<(u64, Duration)>,
    fail_ids: HashSet<u64>,
    fail_all: bool,
    panic_id: Option<u64>,
    quantity: u32,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubProvider {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            quantity: 7,
            ..Default::default()
        }
    }

    /// Latency of `base + (max_id - id) * step`: low ids are the slowest.
    pub fn reverse_latency(mut self, max_id: u64, step: Duration) -> Self {
        self.latency_step = Some((max_id, step));
        self
    }

    pub fn failing(mut self, ids: &[u64]) -> Self {
        self.fail_ids.extend(ids);
        self
    }

    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn panicking_on(mut self, id: u64) -> Self {
        self.panic_id = Some(id);
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn latency_for(&self, id: u64) -> Duration {
        match self.latency_step {
            Some((max_id, step)) => self.latency + step * max_id.saturating_sub(id) as u32,
            None => self.latency,
        }
    }

    async fn lookup(&self, id: u64) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency_for(id)).await;

        if self.panic_id == Some(id) {
            panic!("stub provider panicked on {id}");
        }
        if self.fail_all || self.fail_ids.contains(&id) {
            return Err(ProviderError::Lookup {
                id,
                message: "stub failure".to_string(),
            });
        }
        Ok(())
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DetailProvider for StubProvider {
    fn get(&self, id: u64) -> BoxFuture<'_, Result<Detail, ProviderError>> {
        Box::pin(async move {
            let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);
            self.lookup(id).await?;

            Ok(Detail {
                id,
                name: format!("detail-{id}"),
                description: format!("description of {id}"),
                price: id as f64 + 0.5,
            })
        })
    }
}

impl AvailabilityProvider for StubProvider {
    fn get(&self, id: u64) -> BoxFuture<'_, Result<Availability, ProviderError>> {
        Box::pin(async move {
            self.lookup(id).await?;
            Ok(Availability {
                id,
                quantity: self.quantity,
            })
        })
    }
}

/// Ranked items with ids `1..=count` and descending scores.
pub fn scored_items(count: u64) -> Vec<ScoredItem> {
    (1..=count)
        .map(|id| ScoredItem {
            index: (id - 1) as usize,
            id,
            name: format!("Product {id}"),
            score: 1.0 - id as f32 / 100.0,
        })
        .collect()
}

/// Wait until every clone handed to workers has been dropped.
pub async fn wait_for_strong_count<T>(arc: &Arc<T>, expected: usize, limit: Duration) -> usize {
    let start = tokio::time::Instant::now();
    while Arc::strong_count(arc) != expected && start.elapsed() < limit {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Arc::strong_count(arc)
}

//! Bounded fan-out/fan-in enrichment.
//!
//! Every ranked item becomes a job tagged with its rank. A fixed number of
//! workers drain a pre-filled, closed job queue; each job reports exactly
//! one result into a channel sized to the job count, so a worker can never
//! block on a send, even after the caller stopped listening. Results land in
//! a slot array indexed by rank, which restores the ranking order no matter
//! in which order jobs complete.
//!
//! The call races "all workers finished" against the overall deadline. On
//! deadline the workers are cancelled and whatever slots were filled are
//! returned.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::cancel::{CancelSignal, Cancellation};
use super::pool::ObjectPool;
use super::EnrichedItem;
use crate::providers::{AvailabilityProvider, DetailProvider, ProviderError};
use crate::semantic::ScoredItem;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Number of concurrent workers
    pub workers: usize,
    /// Upper bound for the lookups of a single job
    pub job_timeout: Duration,
    /// Drop items whose stock lookup failed instead of reporting stock 0
    pub require_availability: bool,
    /// Idle records kept by the record pool
    pub pool_max_idle: usize,
}

/// Outcome counts of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub jobs: usize,
    pub enriched: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub deadline_exceeded: bool,
}

struct Job {
    rank: usize,
    id: u64,
    score: f32,
}

enum JobOutcome {
    Enriched(EnrichedItem),
    Failed(ProviderError),
    Cancelled,
}

struct JobResult {
    rank: usize,
    outcome: JobOutcome,
}

struct WorkerContext {
    details: Arc<dyn DetailProvider>,
    availability: Arc<dyn AvailabilityProvider>,
    pool: Arc<ObjectPool<EnrichedItem>>,
    options: PipelineOptions,
}

pub struct EnrichmentPipeline {
    details: Arc<dyn DetailProvider>,
    availability: Arc<dyn AvailabilityProvider>,
    pool: Arc<ObjectPool<EnrichedItem>>,
    options: PipelineOptions,
}

impl EnrichmentPipeline {
    pub fn new(
        details: Arc<dyn DetailProvider>,
        availability: Arc<dyn AvailabilityProvider>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            details,
            availability,
            pool: Arc::new(ObjectPool::new(options.pool_max_idle)),
            options,
        }
    }

    pub fn pool(&self) -> &ObjectPool<EnrichedItem> {
        &self.pool
    }

    /// Hand returned items back to the record pool once the caller has
    /// finished reading them. Later runs fill them in place.
    pub fn recycle(&self, items: impl IntoIterator<Item = EnrichedItem>) {
        for item in items {
            self.pool.release(item);
        }
    }

    /// Enrich `items`, returning the successful ones in rank order.
    ///
    /// Never fails: lookups that error or time out drop their item, and a
    /// missed deadline yields the items finished so far.
    pub async fn run(
        &self,
        items: &[ScoredItem],
        deadline: Instant,
    ) -> (Vec<EnrichedItem>, PipelineReport) {
        let mut report = PipelineReport {
            jobs: items.len(),
            ..Default::default()
        };

        if items.is_empty() {
            return (Vec::new(), report);
        }

        let (job_tx, job_rx) = mpsc::channel(items.len());
        for (rank, item) in items.iter().enumerate() {
            // capacity equals the job count
            let _ = job_tx.try_send(Job {
                rank,
                id: item.id,
                score: item.score,
            });
        }
        drop(job_tx);
        let jobs = Arc::new(Mutex::new(job_rx));

        let (result_tx, mut result_rx) = mpsc::channel(items.len());
        let cancellation = Cancellation::new();
        let ctx = Arc::new(WorkerContext {
            details: self.details.clone(),
            availability: self.availability.clone(),
            pool: self.pool.clone(),
            options: self.options,
        });

        let worker_count = self.options.workers.clamp(1, items.len());
        log::debug!("enriching {} items with {worker_count} workers", items.len());

        let handles: Vec<JoinHandle<()>> = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(worker(
                    worker_id,
                    ctx.clone(),
                    jobs.clone(),
                    result_tx.clone(),
                    cancellation.signal(),
                ))
            })
            .collect();
        drop(result_tx);
        drop(ctx);

        let (done_tx, mut done_rx) = oneshot::channel();
        tokio::spawn(supervise(handles, done_tx));

        let mut slots: Vec<Option<EnrichedItem>> = vec![None; items.len()];
        let deadline_sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(deadline_sleep);

        loop {
            tokio::select! {
                biased;
                Some(result) = result_rx.recv() => record(result, &mut slots, &mut report),
                _ = &mut done_rx => break,
                () = &mut deadline_sleep => {
                    report.deadline_exceeded = true;
                    cancellation.cancel();
                    break;
                }
            }
        }

        // results that arrived together with the completion or deadline
        while let Ok(result) = result_rx.try_recv() {
            record(result, &mut slots, &mut report);
        }

        if report.deadline_exceeded {
            log::warn!(
                "enrichment deadline exceeded: {}/{} items enriched",
                report.enriched,
                report.jobs
            );
        }

        (slots.into_iter().flatten().collect(), report)
    }
}

fn record(result: JobResult, slots: &mut [Option<EnrichedItem>], report: &mut PipelineReport) {
    match result.outcome {
        JobOutcome::Enriched(item) => {
            report.enriched += 1;
            if let Some(slot) = slots.get_mut(result.rank) {
                *slot = Some(item);
            }
        }
        JobOutcome::Failed(err @ ProviderError::Timeout { .. }) => {
            log::debug!("job {}: {err}", result.rank);
            report.timed_out += 1;
        }
        JobOutcome::Failed(err) => {
            log::debug!("job {}: {err}", result.rank);
            report.failed += 1;
        }
        JobOutcome::Cancelled => report.cancelled += 1,
    }
}

async fn worker(
    worker_id: usize,
    ctx: Arc<WorkerContext>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    results: mpsc::Sender<JobResult>,
    mut cancel: CancelSignal,
) {
    loop {
        if cancel.is_cancelled() {
            log::debug!("worker {worker_id}: cancelled");
            break;
        }

        let job = jobs.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => JobOutcome::Cancelled,
            outcome = ctx.process(&job) => outcome,
        };

        // never blocks: capacity equals the job count. A closed receiver
        // means the caller already returned.
        let _ = results.try_send(JobResult {
            rank: job.rank,
            outcome,
        });
    }
}

async fn supervise(handles: Vec<JoinHandle<()>>, done: oneshot::Sender<()>) {
    for handle in handles {
        if let Err(err) = handle.await {
            log::error!("enrichment worker panicked: {err:?}");
        }
    }
    let _ = done.send(());
}

impl WorkerContext {
    async fn process(&self, job: &Job) -> JobOutcome {
        match self.lookup(job).await {
            Ok(item) => JobOutcome::Enriched(item),
            Err(err) => JobOutcome::Failed(err),
        }
    }

    async fn lookup(&self, job: &Job) -> Result<EnrichedItem, ProviderError> {
        let id = job.id;
        let timeout = self.options.job_timeout;

        let (detail, availability) = tokio::time::timeout(timeout, async {
            tokio::join!(self.details.get(id), self.availability.get(id))
        })
        .await
        .map_err(|_| ProviderError::Timeout { id, timeout })?;

        let detail = detail?;
        let stock = match availability {
            Ok(availability) => availability.quantity,
            Err(err) if !self.options.require_availability => {
                log::debug!("item {id}: stock unavailable, reporting 0: {err}");
                0
            }
            Err(err) => return Err(err),
        };

        let mut record = self.pool.acquire();
        record.overwrite(&detail, job.score, stock);

        // output record comes from the pool too, recycled records keep
        // their buffers
        let mut item = self.pool.acquire();
        item.copy_from(&record);
        self.pool.release(record);

        Ok(item)
    }
}

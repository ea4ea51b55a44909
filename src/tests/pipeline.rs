use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::{scored_items, wait_for_strong_count, StubProvider};
use crate::enrich::{EnrichmentPipeline, PipelineOptions};

fn options(workers: usize) -> PipelineOptions {
    PipelineOptions {
        workers,
        job_timeout: Duration::from_millis(500),
        require_availability: true,
        pool_max_idle: 16,
    }
}

fn pipeline(stub: &Arc<StubProvider>, options: PipelineOptions) -> EnrichmentPipeline {
    EnrichmentPipeline::new(stub.clone(), stub.clone(), options)
}

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_keeps_rank_order() {
    // first ranks finish last
    let stub = Arc::new(
        StubProvider::new(Duration::from_millis(1)).reverse_latency(8, Duration::from_millis(5)),
    );
    let pipeline = pipeline(&stub, options(4));

    let items = scored_items(8);
    let (enriched, report) = pipeline.run(&items, far_deadline()).await;

    let ids: Vec<u64> = enriched.iter().map(|item| item.id).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    assert_eq!(report.enriched, 8);
    assert!(!report.deadline_exceeded);

    for (item, scored) in enriched.iter().zip(&items) {
        assert_eq!(item.score, scored.score);
        assert_eq!(item.name, format!("detail-{}", scored.id));
        assert_eq!(item.stock, 7);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_never_exceeds_worker_limit() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(10)));
    let pipeline = pipeline(&stub, options(3));

    let (enriched, _) = pipeline.run(&scored_items(20), far_deadline()).await;

    assert_eq!(enriched.len(), 20);
    assert!(stub.max_in_flight() <= 3, "{} in flight", stub.max_in_flight());
    assert!(stub.max_in_flight() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawns_no_more_workers_than_jobs() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(5)));
    let pipeline = pipeline(&stub, options(16));

    let (enriched, _) = pipeline.run(&scored_items(2), far_deadline()).await;

    assert_eq!(enriched.len(), 2);
    assert!(stub.max_in_flight() <= 2);
}

#[tokio::test]
async fn test_failing_item_does_not_affect_neighbours() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(1)).failing(&[3]));
    let pipeline = pipeline(&stub, options(2));

    let (enriched, report) = pipeline.run(&scored_items(5), far_deadline()).await;

    let ids: Vec<u64> = enriched.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![1, 2, 4, 5]);
    assert_eq!(report.failed, 1);
    assert_eq!(report.enriched, 4);
}

#[tokio::test]
async fn test_all_lookups_fail() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(1)).failing_all());
    let pipeline = pipeline(&stub, options(4));

    let (enriched, report) = pipeline.run(&scored_items(6), far_deadline()).await;

    assert!(enriched.is_empty());
    assert_eq!(report.failed, 6);
    assert!(!report.deadline_exceeded);
}

#[tokio::test]
async fn test_empty_input() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(1)));
    let pipeline = pipeline(&stub, options(4));

    let (enriched, report) = pipeline.run(&[], far_deadline()).await;

    assert!(enriched.is_empty());
    assert_eq!(report.jobs, 0);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_job_timeout_drops_item() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(300)));
    let mut options = options(4);
    options.job_timeout = Duration::from_millis(10);
    let pipeline = pipeline(&stub, options);

    let (enriched, report) = pipeline.run(&scored_items(4), far_deadline()).await;

    assert!(enriched.is_empty());
    assert_eq!(report.timed_out, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_short_deadline_returns_and_workers_exit() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(500)));
    let mut options = options(4);
    options.job_timeout = Duration::from_secs(2);
    let pipeline = pipeline(&stub, options);
    let baseline = Arc::strong_count(&stub);

    let deadline = Duration::from_millis(30);
    let start = Instant::now();
    let (enriched, report) = pipeline.run(&scored_items(10), start + deadline).await;
    let elapsed = start.elapsed();

    assert!(elapsed < deadline + Duration::from_millis(150), "took {elapsed:?}");
    assert!(enriched.is_empty());
    assert!(report.deadline_exceeded);

    let count = wait_for_strong_count(&stub, baseline, Duration::from_secs(1)).await;
    assert_eq!(count, baseline, "workers still hold the providers");
}

#[tokio::test]
async fn test_zero_deadline_returns_immediately() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(50)));
    let pipeline = pipeline(&stub, options(2));
    let baseline = Arc::strong_count(&stub);

    let start = Instant::now();
    let (enriched, report) = pipeline.run(&scored_items(3), start).await;

    assert!(start.elapsed() < Duration::from_millis(100));
    assert!(enriched.is_empty());
    assert!(report.deadline_exceeded);

    let count = wait_for_strong_count(&stub, baseline, Duration::from_secs(1)).await;
    assert_eq!(count, baseline);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_partial_result_on_deadline() {
    // id 6 takes 1ms, id 5 101ms, id 4 201ms and so on
    let stub = Arc::new(
        StubProvider::new(Duration::from_millis(1)).reverse_latency(6, Duration::from_millis(100)),
    );
    let mut options = options(6);
    options.job_timeout = Duration::from_secs(2);
    let pipeline = pipeline(&stub, options);

    let items: Vec<_> = scored_items(6).into_iter().rev().collect();
    let (enriched, report) = pipeline
        .run(&items, Instant::now() + Duration::from_millis(150))
        .await;

    // items arrive in the order they were ranked, not in completion order
    let ids: Vec<u64> = enriched.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![6, 5]);
    assert!(report.deadline_exceeded);
}

#[tokio::test]
async fn test_missing_stock_degrades_to_zero() {
    let details = Arc::new(StubProvider::new(Duration::from_millis(1)));
    let availability = Arc::new(StubProvider::new(Duration::from_millis(1)).failing_all());

    let mut options = options(2);
    options.require_availability = false;
    let lenient = EnrichmentPipeline::new(details.clone(), availability.clone(), options);

    let (enriched, _) = lenient.run(&scored_items(3), far_deadline()).await;
    assert_eq!(enriched.len(), 3);
    assert!(enriched.iter().all(|item| item.stock == 0));

    options.require_availability = true;
    let strict = EnrichmentPipeline::new(details, availability, options);

    let (enriched, report) = strict.run(&scored_items(3), far_deadline()).await;
    assert!(enriched.is_empty());
    assert_eq!(report.failed, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_lookup_is_isolated() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(1)).panicking_on(2));
    let pipeline = pipeline(&stub, options(2));

    let (enriched, report) = pipeline.run(&scored_items(4), far_deadline()).await;

    let ids: Vec<u64> = enriched.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert!(!report.deadline_exceeded);
}

#[tokio::test]
async fn test_recycled_records_are_reused() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(1)));
    let pipeline = pipeline(&stub, options(2));

    let (first, _) = pipeline.run(&scored_items(10), far_deadline()).await;
    let created = pipeline.pool().created();
    // one record per result plus one scratch record per worker at most
    assert!(created <= 12, "{created} records");

    let expected = first.clone();
    pipeline.recycle(first);
    assert_eq!(pipeline.pool().idle_len(), created);

    let (second, _) = pipeline.run(&scored_items(10), far_deadline()).await;

    assert_eq!(second, expected);
    assert_eq!(pipeline.pool().created(), created);
}

#[tokio::test]
async fn test_failed_jobs_do_not_take_records() {
    let stub = Arc::new(StubProvider::new(Duration::from_millis(1)).failing_all());
    let pipeline = pipeline(&stub, options(2));

    let (enriched, _) = pipeline.run(&scored_items(5), far_deadline()).await;

    assert!(enriched.is_empty());
    assert_eq!(pipeline.pool().created(), 0);
}

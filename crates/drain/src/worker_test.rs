use std::sync::Arc;
use std::time::Duration;

use spillway_buffer::RowQueue;
use spillway_channel::testing::RecordingOpener;
use spillway_channel::{ChannelOpener, ChannelRegistry};
use spillway_config::{DrainConfig, WalConfig};
use spillway_protocol::{OffsetToken, PartitionIndex, Row, RowQueueKey, TableRef};
use spillway_wal::DurableLog;

use crate::error::DrainTaskError;
use crate::metrics::DrainMetrics;
use crate::worker::{CommitWaitOutcome, PartitionDrainWorker, TerminationReason};

/// Fixed process epoch for deterministic tokens.
const EPOCH: u64 = 1234;

fn key(table: &str, partition: i64) -> RowQueueKey {
    RowQueueKey::new(
        TableRef::new("db", "public", table),
        PartitionIndex::new(partition),
    )
}

fn row(n: u64) -> Row {
    let mut row = Row::new();
    row.insert("n".to_string(), serde_json::json!(n));
    row
}

fn rows(count: u64) -> Vec<Row> {
    (0..count).map(row).collect()
}

/// Config with intervals shrunk so drains finish in milliseconds.
fn fast_config() -> DrainConfig {
    DrainConfig::default()
        .with_max_drain_duration(Duration::from_millis(200))
        .with_empty_poll_interval(Duration::from_millis(2))
        .with_commit_poll_interval(Duration::from_millis(10))
        .with_max_commit_wait(Duration::from_millis(100))
}

fn worker_over(opener: &Arc<RecordingOpener>, config: DrainConfig) -> PartitionDrainWorker {
    let channels = Arc::new(ChannelRegistry::new(
        Arc::clone(opener) as Arc<dyn ChannelOpener>
    ));
    PartitionDrainWorker::new(EPOCH, channels, config, Arc::new(DrainMetrics::new()))
}

// ============================================================================
// Drain loop
// ============================================================================

#[tokio::test]
async fn test_drains_all_rows_in_offset_order() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(2));

    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    let worker = worker_over(&opener, fast_config().with_max_records_per_drain(2));

    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::Success);
    assert_eq!(channel.appended_tokens(), vec!["0-1234", "1-1234"]);
    assert!(!queue.has_outstanding());
}

#[tokio::test]
async fn test_row_budget_bounds_a_single_drain() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(3));

    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    let worker = worker_over(&opener, fast_config().with_max_records_per_drain(1));

    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::Success);
    assert_eq!(channel.appended_tokens(), vec!["0-1234"]);
    assert_eq!(queue.pending_rows(), 2);
}

#[tokio::test]
async fn test_empty_drain_sends_nothing_and_skips_the_commit_wait() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);

    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    // A commit poll would fault the drain; sending nothing must not poll.
    channel.set_fail_commit_polls(true);

    let config = fast_config().with_max_drain_duration(Duration::from_millis(30));
    let worker = worker_over(&opener, config);

    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::Success);
    assert_eq!(channel.append_count(), 0);
}

#[tokio::test]
async fn test_validation_errors_do_not_abort_the_drain() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(3));

    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.reject_rows_with("NUMBER out of range");

    let worker = worker_over(&opener, fast_config().with_max_records_per_drain(3));
    let reason = worker.drain(&queue).await;

    // Flagged rows still count as sent and their tokens still advance.
    assert_eq!(reason, TerminationReason::Success);
    assert_eq!(channel.append_count(), 3);
    assert!(!queue.has_outstanding());
}

#[tokio::test]
async fn test_worker_records_rows_and_termination() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(2));

    let opener = Arc::new(RecordingOpener::new());
    let channels = Arc::new(ChannelRegistry::new(
        Arc::clone(&opener) as Arc<dyn ChannelOpener>
    ));
    let metrics = Arc::new(DrainMetrics::new());
    let worker = PartitionDrainWorker::new(
        EPOCH,
        channels,
        fast_config().with_max_records_per_drain(2),
        Arc::clone(&metrics),
    );

    worker.drain(&queue).await;

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.rows_drained, 2);
    assert_eq!(snapshot.drains_succeeded, 1);
}

// ============================================================================
// Channel faults
// ============================================================================

#[tokio::test]
async fn test_channel_fault_abandons_the_drain() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(2));

    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.fail_next_append();

    let worker = worker_over(&opener, fast_config().with_max_records_per_drain(2));
    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::ChannelError);
    assert_eq!(channel.append_count(), 0);
    // The faulted handle was invalidated and closed.
    assert!(channel.is_closed());
    // The popped row is gone from the queue; only the second row remains.
    assert_eq!(queue.pending_rows(), 1);
}

#[tokio::test]
async fn test_drain_resumes_at_the_next_offset_after_a_fault() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(2));

    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.fail_next_append();

    let worker = worker_over(&opener, fast_config().with_max_records_per_drain(1));

    assert_eq!(worker.drain(&queue).await, TerminationReason::ChannelError);
    assert_eq!(worker.drain(&queue).await, TerminationReason::Success);

    // Offset 0 went down with the fault; the second drain reopened the
    // channel and carried on from offset 1.
    assert_eq!(channel.appended_tokens(), vec!["1-1234"]);
    assert_eq!(opener.open_count(), 2);
    assert!(!queue.has_outstanding());
}

#[tokio::test]
async fn test_wal_queue_keeps_the_faulted_row_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(
        DurableLog::open(&WalConfig::default().with_path(dir.path())).unwrap(),
    );

    let k = key("events", 0);
    let queue = RowQueue::wal_backed(k.clone(), 100, Arc::clone(&log));
    queue.enqueue_batch(rows(2));

    let opener = Arc::new(RecordingOpener::new());
    opener.channel(&k).fail_next_append();

    let worker = worker_over(&opener, fast_config().with_max_records_per_drain(2));
    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::ChannelError);
    // The queue has moved past offset 0, but its bytes survive in the log.
    assert_eq!(queue.pending_rows(), 1);
    assert!(log.get(&k.log_key(0)).unwrap().is_some());
}

#[tokio::test]
async fn test_invalid_cached_channel_is_reopened_once() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(1));

    let opener = Arc::new(RecordingOpener::new());
    let channels = Arc::new(ChannelRegistry::new(
        Arc::clone(&opener) as Arc<dyn ChannelOpener>
    ));
    // Seed the cache, then break the handle behind the registry's back.
    channels.channel_for(&k).await.unwrap();
    opener.channel(&k).mark_invalid();

    let worker = PartitionDrainWorker::new(
        EPOCH,
        channels,
        fast_config().with_max_records_per_drain(1),
        Arc::new(DrainMetrics::new()),
    );

    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::Success);
    assert_eq!(opener.open_count(), 2);
    assert_eq!(opener.channel(&k).append_count(), 1);
}

#[tokio::test]
async fn test_open_failure_is_an_unexpected_error() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(1));

    let opener = Arc::new(RecordingOpener::new());
    opener.set_fail_opens(true);

    let worker = worker_over(&opener, fast_config());
    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::UnexpectedError);
    // Nothing was popped; the row is still there for the next attempt.
    assert_eq!(queue.pending_rows(), 1);
}

#[tokio::test]
async fn test_commit_poll_fault_is_an_unexpected_error() {
    let k = key("events", 0);
    let queue = RowQueue::in_memory(k.clone(), 100);
    queue.enqueue_batch(rows(1));

    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.set_fail_commit_polls(true);

    let worker = worker_over(&opener, fast_config().with_max_records_per_drain(1));
    let reason = worker.drain(&queue).await;

    assert_eq!(reason, TerminationReason::UnexpectedError);
    // The row had already been sent before the wait failed.
    assert_eq!(channel.append_count(), 1);
}

// ============================================================================
// Commit wait
// ============================================================================

#[tokio::test]
async fn test_commit_wait_matches_when_offsets_line_up() {
    let k = key("events", 0);
    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    // An older epoch is fine; only the offset has to line up.
    channel.set_committed_token("5-1000");

    let worker = worker_over(&opener, fast_config());
    let outcome = worker
        .wait_for_commit(channel.as_ref(), Some(OffsetToken::new(5, EPOCH)))
        .await
        .unwrap();

    assert_eq!(outcome, CommitWaitOutcome::OffsetMatched);
}

#[tokio::test]
async fn test_commit_wait_never_matches_a_lagging_sink() {
    let k = key("events", 0);
    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.set_committed_token("3-1234");

    let worker = worker_over(&opener, fast_config());
    let outcome = worker
        .wait_for_commit(channel.as_ref(), Some(OffsetToken::new(7, EPOCH)))
        .await
        .unwrap();

    assert_eq!(outcome, CommitWaitOutcome::OffsetNeverMatched);
}

#[tokio::test]
async fn test_commit_wait_flags_a_newer_process_epoch() {
    let k = key("events", 0);
    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    // Offset matches, but the epoch is newer than this process; the
    // epoch check wins.
    channel.set_committed_token(format!("0-{}", EPOCH + 1));

    let worker = worker_over(&opener, fast_config());
    let outcome = worker
        .wait_for_commit(channel.as_ref(), Some(OffsetToken::new(0, EPOCH)))
        .await
        .unwrap();

    assert_eq!(outcome, CommitWaitOutcome::InvalidEpoch);
}

#[tokio::test]
async fn test_commit_wait_ignores_absent_and_empty_tokens() {
    let k = key("events", 0);
    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    let worker = worker_over(&opener, fast_config());
    let sent = Some(OffsetToken::new(0, EPOCH));

    // Nothing committed yet: every poll comes back empty-handed.
    let outcome = worker
        .wait_for_commit(channel.as_ref(), sent)
        .await
        .unwrap();
    assert_eq!(outcome, CommitWaitOutcome::OffsetNeverMatched);

    // An empty token is treated the same as no token.
    channel.set_committed_token("");
    let outcome = worker
        .wait_for_commit(channel.as_ref(), sent)
        .await
        .unwrap();
    assert_eq!(outcome, CommitWaitOutcome::OffsetNeverMatched);
}

#[tokio::test]
async fn test_commit_wait_skips_polling_when_nothing_was_sent() {
    let k = key("events", 0);
    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.set_fail_commit_polls(true);

    let worker = worker_over(&opener, fast_config());
    let outcome = worker
        .wait_for_commit(channel.as_ref(), None)
        .await
        .unwrap();

    assert_eq!(outcome, CommitWaitOutcome::OffsetMatched);
}

#[tokio::test]
async fn test_commit_wait_surfaces_poll_faults() {
    let k = key("events", 0);
    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.set_fail_commit_polls(true);

    let worker = worker_over(&opener, fast_config());
    let err = worker
        .wait_for_commit(channel.as_ref(), Some(OffsetToken::new(0, EPOCH)))
        .await
        .unwrap_err();

    assert!(matches!(err, DrainTaskError::Channel(_)));
}

#[tokio::test]
async fn test_commit_wait_rejects_a_malformed_committed_token() {
    let k = key("events", 0);
    let opener = Arc::new(RecordingOpener::new());
    let channel = opener.channel(&k);
    channel.set_committed_token("not-a-token-at-all");

    let worker = worker_over(&opener, fast_config());
    let err = worker
        .wait_for_commit(channel.as_ref(), Some(OffsetToken::new(0, EPOCH)))
        .await
        .unwrap_err();

    assert!(matches!(err, DrainTaskError::Protocol(_)));
}

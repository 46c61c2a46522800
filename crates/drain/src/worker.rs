//! Partition drain worker
//!
//! One drain owns a partition's queue for a bounded window: pop rows in
//! order, append each to the sink channel under its offset token, and
//! once a budget is spent, wait for the sink to report the last sent
//! offset as committed before letting the partition go.

use std::sync::Arc;
use std::time::Instant;

use spillway_buffer::RowQueue;
use spillway_channel::{ChannelRegistry, SinkChannel};
use spillway_config::DrainConfig;
use spillway_protocol::OffsetToken;

use crate::error::DrainTaskError;
use crate::metrics::DrainMetrics;

/// How a partition drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The drain spent its budget and ran its commit wait
    Success,
    /// The channel faulted mid-append and was invalidated
    ChannelError,
    /// Anything else went wrong
    UnexpectedError,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::ChannelError => "channel_error",
            Self::UnexpectedError => "unexpected_error",
        };
        f.write_str(s)
    }
}

/// How the post-drain commit wait ended.
///
/// Every outcome still counts as a successful drain; the distinction
/// matters for logs and for anyone watching sink lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitWaitOutcome {
    /// The sink reported the last sent offset as committed
    OffsetMatched,
    /// The wait budget ran out before the offsets lined up
    OffsetNeverMatched,
    /// The sink reported a token stamped by a newer process epoch
    InvalidEpoch,
}

impl std::fmt::Display for CommitWaitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OffsetMatched => "offset_matched",
            Self::OffsetNeverMatched => "offset_never_matched",
            Self::InvalidEpoch => "invalid_epoch",
        };
        f.write_str(s)
    }
}

/// Drains one row queue into its sink channel.
///
/// The worker is stateless across invocations; everything it needs to
/// know about a partition lives in the queue and the channel registry.
pub struct PartitionDrainWorker {
    /// Epoch stamped into every offset token this process emits
    epoch_millis: u64,
    channels: Arc<ChannelRegistry>,
    config: DrainConfig,
    metrics: Arc<DrainMetrics>,
}

impl PartitionDrainWorker {
    pub fn new(
        epoch_millis: u64,
        channels: Arc<ChannelRegistry>,
        config: DrainConfig,
        metrics: Arc<DrainMetrics>,
    ) -> Self {
        Self {
            epoch_millis,
            channels,
            config,
            metrics,
        }
    }

    /// Drain the queue until a budget is spent, then wait for the sink
    /// to commit the last sent offset.
    ///
    /// Never fails: every error maps to a termination reason, and the
    /// outcome lands in the metrics either way.
    pub async fn drain(&self, queue: &RowQueue) -> TerminationReason {
        let reason = match self.try_drain(queue).await {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!(key = %queue.key(), error = %e, "partition drain failed");
                self.channels.invalidate(queue.key()).await;
                TerminationReason::UnexpectedError
            }
        };
        self.metrics.record_termination(reason);
        reason
    }

    async fn try_drain(&self, queue: &RowQueue) -> Result<TerminationReason, DrainTaskError> {
        let key = queue.key();

        let mut channel = self.channels.channel_for(key).await?;
        if !channel.is_valid() {
            tracing::warn!(
                key = %key,
                channel = channel.name(),
                "cached channel went invalid, reopening"
            );
            self.channels.invalidate(key).await;
            channel = self.channels.channel_for(key).await?;
        }

        let started = Instant::now();
        let mut rows_sent: u64 = 0;
        let mut last_sent: Option<OffsetToken> = None;

        loop {
            if started.elapsed() >= self.config.max_drain_duration
                || rows_sent >= self.config.max_records_per_drain
            {
                break;
            }

            let Some(entry) = queue.dequeue_one() else {
                tokio::time::sleep(self.config.empty_poll_interval).await;
                continue;
            };

            let token = OffsetToken::new(entry.offset, self.epoch_millis);
            match channel.append_row(&entry.row, &token.to_string()).await {
                Ok(outcome) => {
                    for error in &outcome.errors {
                        tracing::warn!(
                            key = %key,
                            offset = entry.offset,
                            error = %error,
                            "sink flagged row content, continuing"
                        );
                    }
                    rows_sent += 1;
                    last_sent = Some(token);
                    self.metrics.record_row_drained();
                }
                Err(e) => {
                    tracing::error!(
                        key = %key,
                        offset = entry.offset,
                        error = %e,
                        "channel fault while appending, abandoning drain"
                    );
                    self.channels.invalidate(key).await;
                    return Ok(TerminationReason::ChannelError);
                }
            }
        }

        let outcome = self.wait_for_commit(channel.as_ref(), last_sent).await?;
        tracing::debug!(
            key = %key,
            rows_sent,
            outcome = %outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "partition drain finished"
        );
        Ok(TerminationReason::Success)
    }

    /// Poll the sink until the committed offset equals the last sent
    /// offset, the wait budget runs out, or a newer epoch shows up.
    ///
    /// A drain that sent nothing has nothing to wait for.
    pub(crate) async fn wait_for_commit(
        &self,
        channel: &dyn SinkChannel,
        last_sent: Option<OffsetToken>,
    ) -> Result<CommitWaitOutcome, DrainTaskError> {
        let Some(sent) = last_sent else {
            return Ok(CommitWaitOutcome::OffsetMatched);
        };

        let interval = self.config.commit_poll_interval;
        let attempts =
            (self.config.max_commit_wait.as_millis() / interval.as_millis().max(1)) as u64;

        for _ in 0..attempts {
            tokio::time::sleep(interval).await;

            let Some(text) = channel.latest_committed_token().await? else {
                continue;
            };
            if text.is_empty() {
                continue;
            }

            let committed: OffsetToken = text.parse()?;
            if committed.epoch_millis() > self.epoch_millis {
                tracing::warn!(
                    channel = channel.name(),
                    committed = %committed,
                    epoch_millis = self.epoch_millis,
                    "sink reports a token from a newer process epoch, giving up the wait"
                );
                return Ok(CommitWaitOutcome::InvalidEpoch);
            }
            if committed.offset() == sent.offset() {
                return Ok(CommitWaitOutcome::OffsetMatched);
            }

            tracing::trace!(
                channel = channel.name(),
                committed = %committed,
                sent = %sent,
                "sink not caught up yet"
            );
        }

        tracing::warn!(
            channel = channel.name(),
            sent = %sent,
            wait = ?self.config.max_commit_wait,
            "sink never reported the last sent offset as committed"
        );
        Ok(CommitWaitOutcome::OffsetNeverMatched)
    }
}

impl std::fmt::Debug for PartitionDrainWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionDrainWorker")
            .field("epoch_millis", &self.epoch_millis)
            .finish_non_exhaustive()
    }
}

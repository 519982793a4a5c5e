//! Transfer session: one logical call, driven chunk by chunk.
//!
//! A session owns its queue, accumulator and retry counter for the whole
//! call. Chunk *k+1* is planned only after chunk *k* has settled, so the
//! queue and the accumulator are never observed mid-update. When the retry
//! controller gives up, the accumulator is dropped and only the failure is
//! returned.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::planner::{IndexWindow, WorkQueue};
use super::retry::RetryController;
use super::termination::{PageReport, Step, TerminationPolicy};
use crate::core::Record;
use crate::error::{BulkError, Result};

/// Counters for one session, reported when it completes.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Chunks dispatched successfully.
    pub chunks: usize,
    /// Re-attempts across all chunks.
    pub retries: u32,
    /// Items accumulated into the result.
    pub records: usize,
    /// Wall-clock time of the session.
    pub elapsed: Duration,
}

pub struct TransferSession {
    operation: String,
    retry: RetryController,
    policy: TerminationPolicy,
    stats: SessionStats,
    started: Instant,
}

impl TransferSession {
    pub fn new(
        operation: impl Into<String>,
        max_consecutive_errors: u32,
        policy: TerminationPolicy,
    ) -> Self {
        Self {
            operation: operation.into(),
            retry: RetryController::new(max_consecutive_errors),
            policy,
            stats: SessionStats::default(),
            started: Instant::now(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Consume `items` in chunks of `chunk_size`, dispatching each in order.
    ///
    /// `dispatch` receives an owned copy of the chunk so that a retried
    /// attempt sends exactly the same items.
    pub async fn drain<I, O, F, Fut>(
        mut self,
        items: Vec<I>,
        chunk_size: usize,
        mut dispatch: F,
    ) -> Result<(Vec<O>, SessionStats)>
    where
        I: Clone,
        F: FnMut(Vec<I>) -> Fut,
        Fut: Future<Output = Result<Vec<O>>>,
    {
        check_chunk_size(&self.operation, chunk_size)?;

        let mut queue = WorkQueue::new(items);
        let mut accumulator = Vec::new();

        while self.policy.before_dispatch(queue.len()) == Step::Continue {
            let chunk = queue.peek(chunk_size).to_vec();
            let taken = chunk.len();
            debug!(
                "{}: chunk {} with {} items ({} queued)",
                self.operation,
                self.stats.chunks + 1,
                taken,
                queue.len()
            );

            let page = self
                .retry
                .dispatch(&self.operation, || dispatch(chunk.clone()))
                .await?;

            queue.advance(taken);
            self.stats.chunks += 1;
            let page_rows = page.len();
            accumulator.extend(page);
            debug!("{}: chunk returned {} rows", self.operation, page_rows);

            let report = PageReport {
                page_rows,
                remaining: queue.len(),
                accumulated: accumulator.len(),
                last_record: None,
            };
            if self.policy.after_page(&report) == Step::Stop {
                break;
            }
        }

        let stats = self.finish(accumulator.len());
        Ok((accumulator, stats))
    }

    /// Fetch index windows of `page_size` until the policy stops the scan.
    ///
    /// Each window starts right after the records accumulated so far.
    pub async fn scan<F, Fut>(
        mut self,
        page_size: usize,
        mut dispatch: F,
    ) -> Result<(Vec<Record>, SessionStats)>
    where
        F: FnMut(IndexWindow) -> Fut,
        Fut: Future<Output = Result<Vec<Record>>>,
    {
        check_chunk_size(&self.operation, page_size)?;

        let mut accumulator: Vec<Record> = Vec::new();

        loop {
            let window = IndexWindow::after(accumulator.len(), page_size);
            debug!(
                "{}: page {} (index {}..={})",
                self.operation,
                self.stats.chunks + 1,
                window.from_index,
                window.to_index
            );

            let page = self
                .retry
                .dispatch(&self.operation, || dispatch(window))
                .await?;

            self.stats.chunks += 1;
            let page_rows = page.len();
            accumulator.extend(page);
            debug!("{}: page returned {} records", self.operation, page_rows);

            let report = PageReport {
                page_rows,
                remaining: 0,
                accumulated: accumulator.len(),
                last_record: accumulator.last(),
            };
            if self.policy.after_page(&report) == Step::Stop {
                break;
            }
        }

        let stats = self.finish(accumulator.len());
        Ok((accumulator, stats))
    }

    fn finish(mut self, records: usize) -> SessionStats {
        self.stats.records = records;
        self.stats.retries = self.retry.total_retries();
        self.stats.elapsed = self.started.elapsed();
        info!(
            "{}: {} records in {} chunks ({} retries, {:?})",
            self.operation,
            self.stats.records,
            self.stats.chunks,
            self.stats.retries,
            self.stats.elapsed
        );
        self.stats
    }
}

fn check_chunk_size(operation: &str, size: usize) -> Result<()> {
    if size == 0 {
        return Err(BulkError::Config(format!(
            "{}: chunk size must be at least 1",
            operation
        )));
    }
    Ok(())
}

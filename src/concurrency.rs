//! Worker pool: a fixed number of workers pulling batches off a shared cursor.
//!
//! Each worker loops: check stop, claim the next batch index, call the model,
//! check stop again, deliver. The claim is a single atomic increment, so no batch
//! is processed twice and none is skipped. Delivery (counter update, batch
//! callback, progress callback) happens under one lock that is never held across
//! an await, which keeps `processed` monotonic as seen by the sink.
//!
//! A stop request lets in-flight calls finish but discards their results.

use crate::batch::Batch;
use crate::cancel::CancelSignal;
use crate::error::{Result, UpsellError};
use crate::inference::InferenceAdapter;
use crate::record::Product;
use crate::sink::{Progress, ResultSink};
use crate::summary::CatalogSummary;
use futures::future::try_join_all;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// How a run ended, when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Summary of a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub progress: Progress,
    pub batches_total: usize,
    pub batches_reported: usize,
}

struct Delivery<S> {
    sink: S,
    processed: usize,
    reported: usize,
}

/// Bounded-parallelism scheduler over a fixed batch list.
#[derive(Clone, Copy, Debug)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(UpsellError::InvalidConcurrency(concurrency));
        }
        Ok(Self { concurrency })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Drive every batch through `adapter`, streaming results into `sink`.
    ///
    /// Resolves once all workers have exited. A transport error from the adapter
    /// aborts the remaining workers and is returned; deliveries made before it
    /// stay with the sink.
    ///
    /// The outcome is `Cancelled` only when some worker observed the stop signal,
    /// before a claim or after a call. A stop that lands after every worker has
    /// passed its last check still yields `Completed` and the final report.
    pub async fn run<A, S>(
        &self,
        batches: &[Batch<Product>],
        summary: &CatalogSummary,
        adapter: &A,
        cancel: &CancelSignal,
        sink: S,
    ) -> Result<RunReport>
    where
        A: InferenceAdapter + ?Sized,
        S: ResultSink,
    {
        let total: usize = batches.iter().map(|b| b.len()).sum();
        let cursor = AtomicUsize::new(0);
        let stopped = AtomicBool::new(false);
        let delivery = Mutex::new(Delivery { sink, processed: 0, reported: 0 });

        tracing::info!(
            batches = batches.len(),
            products = total,
            workers = self.concurrency,
            "starting generation run"
        );

        let workers = (0..self.concurrency).map(|worker_id| {
            worker_loop(worker_id, batches, summary, adapter, cancel, &cursor, &stopped, &delivery, total)
        });
        try_join_all(workers).await?;

        let mut delivery = delivery.into_inner();
        let outcome = if stopped.load(Ordering::Acquire) {
            tracing::info!(processed = delivery.processed, total, "run stopped on request");
            RunOutcome::Cancelled
        } else {
            // Terminal report, idempotent when the last batch already summed to total.
            delivery.sink.on_progress(Progress::new(total, total));
            tracing::info!(total, "run completed");
            RunOutcome::Completed
        };

        Ok(RunReport {
            outcome,
            progress: Progress::new(delivery.processed, total),
            batches_total: batches.len(),
            batches_reported: delivery.reported,
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop<A, S>(
    worker_id: usize,
    batches: &[Batch<Product>],
    summary: &CatalogSummary,
    adapter: &A,
    cancel: &CancelSignal,
    cursor: &AtomicUsize,
    stopped: &AtomicBool,
    delivery: &Mutex<Delivery<S>>,
    total: usize,
) -> Result<()>
where
    A: InferenceAdapter + ?Sized,
    S: ResultSink,
{
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(worker_id, "worker stopping before claiming a batch");
            stopped.store(true, Ordering::Release);
            return Ok(());
        }

        let index = cursor.fetch_add(1, Ordering::AcqRel);
        let Some(batch) = batches.get(index) else {
            tracing::debug!(worker_id, "no batches left");
            return Ok(());
        };
        tracing::debug!(worker_id, batch = index, size = batch.len(), "claimed batch");

        let results = match adapter.infer(batch, summary).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(worker_id, batch = index, "fatal inference error: {}", e);
                return Err(e);
            }
        };

        if cancel.is_cancelled() {
            tracing::debug!(worker_id, batch = index, "discarding batch finished after stop request");
            stopped.store(true, Ordering::Release);
            return Ok(());
        }

        let mut d = delivery.lock();
        d.processed += batch.len();
        d.reported += 1;
        let progress = Progress::new(d.processed, total);
        d.sink.on_batch_done(results);
        d.sink.on_progress(progress);
    }
}

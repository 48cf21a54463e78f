//! Result/progress sinks fed by the worker pool.
//!
//! The pool hands every completed batch to `on_batch_done` exactly once and then
//! reports the running total through `on_progress`. Both calls happen under the
//! pool's delivery lock, so an implementation never sees interleaved updates.

use crate::inference::RecommendationResult;
use tokio::sync::mpsc;

/// Items processed out of the run total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(processed: usize, total: usize) -> Self {
        Self { processed, total }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Consumer side of a run. Deliveries arrive in completion order, not input order.
pub trait ResultSink: Send {
    fn on_batch_done(&mut self, results: Vec<RecommendationResult>);
    fn on_progress(&mut self, progress: Progress);
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn on_batch_done(&mut self, results: Vec<RecommendationResult>) {
        (**self).on_batch_done(results)
    }
    fn on_progress(&mut self, progress: Progress) {
        (**self).on_progress(progress)
    }
}

/// Adapts a pair of closures to `ResultSink`.
pub struct CallbackSink<B, P> {
    on_batch: B,
    on_progress: P,
}

impl<B, P> CallbackSink<B, P>
where
    B: FnMut(Vec<RecommendationResult>) + Send,
    P: FnMut(Progress) + Send,
{
    pub fn new(on_batch: B, on_progress: P) -> Self {
        Self { on_batch, on_progress }
    }
}

impl<B, P> ResultSink for CallbackSink<B, P>
where
    B: FnMut(Vec<RecommendationResult>) + Send,
    P: FnMut(Progress) + Send,
{
    fn on_batch_done(&mut self, results: Vec<RecommendationResult>) {
        (self.on_batch)(results)
    }
    fn on_progress(&mut self, progress: Progress) {
        (self.on_progress)(progress)
    }
}

/// Accumulates every delivered result and remembers the last progress report.
#[derive(Debug, Default)]
pub struct ResultCollector {
    results: Vec<RecommendationResult>,
    deliveries: usize,
    last_progress: Option<Progress>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[RecommendationResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<RecommendationResult> {
        self.results
    }

    /// Number of `on_batch_done` calls received.
    pub fn deliveries(&self) -> usize {
        self.deliveries
    }

    pub fn last_progress(&self) -> Option<Progress> {
        self.last_progress
    }

    /// Results carrying the failure sentinel.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }
}

impl ResultSink for ResultCollector {
    fn on_batch_done(&mut self, results: Vec<RecommendationResult>) {
        self.deliveries += 1;
        self.results.extend(results);
    }
    fn on_progress(&mut self, progress: Progress) {
        self.last_progress = Some(progress);
    }
}

/// Event form of the two sink callbacks, for consumers that pull.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Batch(Vec<RecommendationResult>),
    Progress(Progress),
}

/// Forwards deliveries into an unbounded channel drained by the caller.
/// Sends after the receiver is dropped are ignored.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn on_batch_done(&mut self, results: Vec<RecommendationResult>) {
        let _ = self.tx.send(RunEvent::Batch(results));
    }
    fn on_progress(&mut self, progress: Progress) {
        let _ = self.tx.send(RunEvent::Progress(progress));
    }
}

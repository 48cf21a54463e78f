//! Terminal progress: an `indicatif` count bar driven by the run's sink callbacks.

use crate::inference::RecommendationResult;
use crate::sink::{Progress, ResultCollector, ResultSink};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Count-style progress bar (products processed out of total), with an optional label.
pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         elapsed: {elapsed_precise}  eta: {eta_precise}"
    )
    .unwrap()
    .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// A small wrapper around an `indicatif` bar that tracks absolute positions,
/// since batches complete out of order and report running totals.
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    pub fn count<T: Into<String>>(label: T, total: u64) -> Self {
        Self { pb: make_count_progress(total, &label.into()) }
    }
    pub fn hidden() -> Self {
        Self { pb: ProgressBar::hidden() }
    }
    #[inline]
    pub fn set_position(&self, pos: u64) {
        self.pb.set_position(pos);
    }
    pub fn set_message<T: Into<String>>(&self, msg: T) {
        self.pb.set_message(msg.into());
    }
    pub fn finish<T: Into<String>>(&self, msg: T) {
        self.pb.finish_with_message(msg.into());
    }
    pub fn abandon<T: Into<String>>(&self, msg: T) {
        self.pb.abandon_with_message(msg.into());
    }
}

/// Sink that collects results and mirrors progress onto a bar.
pub struct ProgressSink {
    scope: ProgressScope,
    collector: ResultCollector,
    failed: usize,
}

impl ProgressSink {
    pub fn new(scope: ProgressScope) -> Self {
        Self { scope, collector: ResultCollector::new(), failed: 0 }
    }

    pub fn scope(&self) -> &ProgressScope {
        &self.scope
    }

    pub fn collector(&self) -> &ResultCollector {
        &self.collector
    }

    /// Sentinel results seen so far.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn into_parts(self) -> (ProgressScope, ResultCollector) {
        (self.scope, self.collector)
    }
}

impl ResultSink for ProgressSink {
    fn on_batch_done(&mut self, results: Vec<RecommendationResult>) {
        let failed = results.iter().filter(|r| r.is_failed()).count();
        self.collector.on_batch_done(results);
        if failed > 0 {
            self.failed += failed;
            self.scope.set_message(format!("Generating ({} failed)", self.failed));
        }
    }
    fn on_progress(&mut self, progress: Progress) {
        self.collector.on_progress(progress);
        self.scope.set_position(progress.processed as u64);
    }
}

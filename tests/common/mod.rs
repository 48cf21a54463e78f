#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use upsell::{
    Batch, CallError, CatalogSummary, InferenceAdapter, InferenceClient, InferenceRequest, Product,
    Progress, RecommendationResult, ResultSink, UpsellError,
};

/// Product `i` of a synthetic catalog. Every two children share a parent.
pub fn product(i: usize) -> Product {
    Product {
        parent_id: format!("P{}", i / 2),
        child_id: format!("C{}", i),
        title: format!("Parent product {}", i / 2),
        category: "Basins".to_string(),
    }
}

pub fn products(n: usize) -> Vec<Product> {
    (0..n).map(product).collect()
}

/// Recommendations a well-behaved model would return for `p`.
pub fn canned_result(p: &Product) -> RecommendationResult {
    let ids = |tag: &str| (0..8).map(|k| format!("{}-{}{}", p.parent_id, tag, k)).collect();
    RecommendationResult::new(p.child_id.clone(), ids("e"), ids("s"))
}

/// CSV text with the required headers plus a passthrough column.
pub fn catalog_csv(n: usize) -> String {
    let mut s = String::from("VS Parent ID,VS Child ID,Parent Product Title,Categories,Finish\n");
    for p in products(n) {
        s.push_str(&format!("{},{},{},{},Chrome\n", p.parent_id, p.child_id, p.title, p.category));
    }
    s
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// How the scripted adapter treats one batch index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Script {
    Ok,
    SentinelFailure,
    TransportFault,
    Delay(u64),
}

/// Test adapter: canned results per product, per-batch scripts, an optional
/// gate every call must pass, and bookkeeping of what was called.
pub struct ScriptedAdapter {
    scripts: Vec<(usize, Script)>,
    gate: Option<Semaphore>,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    claimed: Mutex<Vec<usize>>,
    summaries: Mutex<HashSet<String>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            scripts: Vec::new(),
            gate: None,
            started: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            claimed: Mutex::new(Vec::new()),
            summaries: Mutex::new(HashSet::new()),
        }
    }

    pub fn script(mut self, batch: usize, script: Script) -> Self {
        self.scripts.push((batch, script));
        self
    }

    /// Calls block until `open_gate` releases them.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn open_gate(&self) {
        if let Some(g) = &self.gate {
            g.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Let `n` gated calls through.
    pub fn release(&self, n: usize) {
        if let Some(g) = &self.gate {
            g.add_permits(n);
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Batch indices in the order calls were started.
    pub fn claimed(&self) -> Vec<usize> {
        self.claimed.lock().clone()
    }

    pub fn distinct_summaries(&self) -> usize {
        self.summaries.lock().len()
    }

    /// Wait until `n` calls have started.
    pub async fn wait_started(&self, n: usize) {
        while self.started() < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn script_for(&self, batch: usize) -> Script {
        self.scripts.iter().find(|(b, _)| *b == batch).map(|(_, s)| *s).unwrap_or(Script::Ok)
    }
}

#[async_trait]
impl InferenceAdapter for ScriptedAdapter {
    async fn infer(&self, batch: &Batch<Product>, summary: &CatalogSummary) -> Result<Vec<RecommendationResult>, UpsellError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.claimed.lock().push(batch.index());
        self.summaries.lock().insert(summary.as_str().to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(g) = &self.gate {
            g.acquire().await.unwrap().forget();
        }
        let script = self.script_for(batch.index());
        if let Script::Delay(ms) = script {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        // Let sibling workers interleave even on the fast path.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match script {
            Script::TransportFault => Err(UpsellError::Transport("connection refused".into())),
            Script::SentinelFailure => Ok(upsell::sentinel_results(batch.items())),
            Script::Ok | Script::Delay(_) => Ok(batch.iter().map(canned_result).collect()),
        }
    }
}

/// Raw model client returning a fixed reply and recording prompts.
pub struct FixedClient {
    reply: Result<String, CallError>,
    pub prompts: Mutex<Vec<InferenceRequest>>,
}

impl FixedClient {
    pub fn text(reply: impl Into<String>) -> Self {
        Self { reply: Ok(reply.into()), prompts: Mutex::new(Vec::new()) }
    }
    pub fn failing(err: CallError) -> Self {
        Self { reply: Err(err), prompts: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl InferenceClient for FixedClient {
    async fn generate(&self, request: &InferenceRequest) -> Result<String, CallError> {
        self.prompts.lock().push(request.clone());
        match &self.reply {
            Ok(s) => Ok(s.clone()),
            Err(CallError::Batch(m)) => Err(CallError::Batch(m.clone())),
            Err(CallError::Transport(m)) => Err(CallError::Transport(m.clone())),
        }
    }
}

/// Sink recording every callback in order.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Vec<Vec<RecommendationResult>>,
    pub progress: Vec<Progress>,
    /// Interleaved log: `Some(len)` for a batch, `None` for a progress report.
    pub events: Vec<Option<usize>>,
}

impl ResultSink for RecordingSink {
    fn on_batch_done(&mut self, results: Vec<RecommendationResult>) {
        self.events.push(Some(results.len()));
        self.batches.push(results);
    }
    fn on_progress(&mut self, progress: Progress) {
        self.events.push(None);
        self.progress.push(progress);
    }
}

impl RecordingSink {
    pub fn delivered(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn assert_monotonic(&self) {
        for w in self.progress.windows(2) {
            assert!(w[0].processed <= w[1].processed, "progress went backwards: {:?}", self.progress);
        }
        for p in &self.progress {
            assert!(p.processed <= p.total, "processed exceeds total: {:?}", p);
        }
    }
}

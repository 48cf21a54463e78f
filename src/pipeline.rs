use crate::batch::partition;
use crate::cancel::CancelSignal;
use crate::concurrency::{RunOutcome, RunReport, WorkerPool};
use crate::config::{Columns, UpsellOptions};
use crate::error::{Result, UpsellError};
use crate::export::{annotate, existing_recommendations};
use crate::gemini::GeminiClient;
use crate::inference::{InferenceAdapter, RecommendationAdapter, RecommendationResult};
use crate::progress::{ProgressScope, ProgressSink};
use crate::record::{Product, Table};
use crate::sheet::{read_table, write_table};
use crate::sink::ResultSink;
use crate::summary::{summarize, CatalogSummary};
use crate::util::init_tracing_once;
use std::path::Path;
use std::time::Duration;

/// A validated catalog: the original table plus the typed product projection.
#[derive(Clone, Debug)]
pub struct Catalog {
    table: Table,
    products: Vec<Product>,
}

impl Catalog {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[derive(Clone, Default)]
pub struct UpsellGen {
    pub(crate) opts: UpsellOptions,
}

impl UpsellGen {
    pub fn new() -> Self {
        Self { opts: UpsellOptions::default() }
    }

    /// Start from `UpsellOptions::from_env()` (API key, model, endpoint).
    pub fn from_env() -> Self {
        Self { opts: UpsellOptions::from_env() }
    }

    pub fn options(&self) -> &UpsellOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn batch_size(mut self, n: usize) -> Self { self.opts = self.opts.with_batch_size(n); self }
    pub fn concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_concurrency(n); self }
    pub fn columns(mut self, columns: Columns) -> Self { self.opts = self.opts.with_columns(columns); self }
    pub fn model(mut self, model: impl Into<String>) -> Self { self.opts = self.opts.with_model(model); self }
    pub fn endpoint(mut self, endpoint: impl AsRef<str>) -> Self { self.opts = self.opts.with_endpoint(endpoint); self }
    pub fn api_key(mut self, key: impl Into<String>) -> Self { self.opts = self.opts.with_api_key(key); self }
    pub fn temperature(mut self, t: f32) -> Self { self.opts = self.opts.with_temperature(t); self }
    pub fn request_timeout(mut self, timeout: Duration) -> Self { self.opts = self.opts.with_request_timeout(timeout); self }
    pub fn guidelines(mut self, text: impl Into<String>) -> Self { self.opts = self.opts.with_guidelines(text); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }

    // -------- Operations --------

    /// Read and validate a catalog file (.csv, .xlsx, .jsonl, .ndjson).
    pub fn load(&self, path: &Path) -> Result<Catalog> {
        init_tracing_once();
        let table = read_table(path, &self.opts.columns.required())?;
        let catalog = self.catalog_from_table(table)?;
        tracing::info!("Loaded {} products from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Validate an in-memory table: it must have rows and every required header.
    pub fn catalog_from_table(&self, table: Table) -> Result<Catalog> {
        if table.rows.is_empty() {
            return Err(UpsellError::Validation("the spreadsheet appears to be empty".into()));
        }
        let required = self.opts.columns.required();
        let missing = table.missing_headers(&required);
        if !missing.is_empty() {
            return Err(UpsellError::Validation(format!(
                "missing required columns: {} (expected {})",
                missing.join(", "),
                required.join(", ")
            )));
        }
        let products = table.rows.iter().map(|r| Product::from_row(r, &self.opts.columns)).collect();
        Ok(Catalog { table, products })
    }

    /// Shared context for every model call of a run over `catalog`.
    pub fn summary(&self, catalog: &Catalog) -> CatalogSummary {
        summarize(catalog.products())
    }

    /// Recommendations already present in the catalog, when it carries both columns.
    pub fn existing(&self, catalog: &Catalog) -> Option<Vec<RecommendationResult>> {
        existing_recommendations(catalog.table(), &self.opts.columns)
    }

    /// The Gemini-backed adapter configured from these options.
    pub fn gemini_adapter(&self) -> Result<RecommendationAdapter<GeminiClient>> {
        let client = GeminiClient::new(&self.opts)?;
        Ok(RecommendationAdapter::new(client, self.opts.columns.clone(), self.opts.guidelines.clone()))
    }

    /// Run generation over `catalog`, streaming into `sink`.
    ///
    /// The summary is computed once here and shared by all workers. Returns the
    /// run report on completion or cancellation, and an error for transport faults.
    pub async fn generate<A, S>(&self, catalog: &Catalog, adapter: &A, cancel: &CancelSignal, sink: S) -> Result<RunReport>
    where
        A: InferenceAdapter + ?Sized,
        S: ResultSink,
    {
        init_tracing_once();
        let pool = WorkerPool::new(self.opts.concurrency)?;
        let batches = partition(catalog.products(), self.opts.batch_size)?;
        let summary = self.summary(catalog);
        tracing::info!(
            "Catalog summary: {} unique entries for {} products",
            summary.line_count(),
            catalog.len()
        );
        pool.run(&batches, &summary, adapter, cancel, sink).await
    }

    /// Like `generate`, collecting results behind an optional progress bar.
    pub async fn generate_collect<A>(
        &self,
        catalog: &Catalog,
        adapter: &A,
        cancel: &CancelSignal,
    ) -> (Result<RunReport>, Vec<RecommendationResult>)
    where
        A: InferenceAdapter + ?Sized,
    {
        let scope = if self.opts.progress {
            ProgressScope::count(self.opts.progress_label.as_deref().unwrap_or("Generating"), catalog.len() as u64)
        } else {
            ProgressScope::hidden()
        };
        let mut sink = ProgressSink::new(scope);
        let res = self.generate(catalog, adapter, cancel, &mut sink).await;
        let (scope, collector) = sink.into_parts();
        match &res {
            Ok(report) if report.outcome == RunOutcome::Completed => scope.finish("done"),
            Ok(_) => scope.abandon("stopped"),
            Err(_) => scope.abandon("failed"),
        }
        (res, collector.into_results())
    }

    /// Write `catalog` annotated with `results` to `path` (format by extension).
    pub fn export(&self, catalog: &Catalog, results: &[RecommendationResult], path: &Path) -> Result<()> {
        let annotated = annotate(catalog.table(), results, &self.opts.columns);
        write_table(path, &annotated)?;
        tracing::info!("Wrote {} rows to {}", annotated.rows.len(), path.display());
        Ok(())
    }
}

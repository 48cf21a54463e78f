//! Inference boundary: one model call per batch, typed results out.
//!
//! `InferenceClient` is the raw text-in/text-out call. `RecommendationAdapter`
//! wraps a client, builds the prompt, and turns whatever comes back into exactly
//! one `RecommendationResult` per input product. Per-batch failures become
//! sentinel results; only transport faults escape as errors.

use crate::batch::Batch;
use crate::config::Columns;
use crate::error::{CallError, Result, UpsellError};
use crate::prompt::{build_prompt, response_schema};
use crate::record::Product;
use crate::summary::CatalogSummary;
use ahash::AHashMap;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::OnceLock;

/// Marker stored in both recommendation lists when a product's batch failed.
pub const FAILURE_MARKER: &str = "API_ERROR";

/// Recommendations for one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub child_id: String,
    pub essential: Vec<String>,
    pub stylistic: Vec<String>,
}

impl RecommendationResult {
    pub fn new(child_id: impl Into<String>, essential: Vec<String>, stylistic: Vec<String>) -> Self {
        Self { child_id: child_id.into(), essential, stylistic }
    }

    /// Sentinel result for a product whose batch could not be processed.
    pub fn failed(child_id: impl Into<String>) -> Self {
        Self::new(child_id, vec![FAILURE_MARKER.to_string()], vec![FAILURE_MARKER.to_string()])
    }

    pub fn is_failed(&self) -> bool {
        let marked = |l: &[String]| l.len() == 1 && l[0] == FAILURE_MARKER;
        marked(&self.essential) && marked(&self.stylistic)
    }
}

/// Everything a raw model call needs.
#[derive(Clone, Debug)]
pub struct InferenceRequest {
    pub prompt: String,
    pub schema: Value,
}

/// Raw model call. Implementations classify failures as per-batch or transport.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, request: &InferenceRequest) -> std::result::Result<String, CallError>;
}

/// Batch-level contract used by the worker pool.
#[async_trait]
pub trait InferenceAdapter: Send + Sync {
    /// Recommendations for every product in `batch`, in batch order.
    /// Errors are reserved for faults that make every later call fail too.
    async fn infer(&self, batch: &Batch<Product>, summary: &CatalogSummary) -> Result<Vec<RecommendationResult>>;
}

/// Prompting/parsing adapter around an `InferenceClient`.
pub struct RecommendationAdapter<C> {
    client: C,
    columns: Columns,
    guidelines: String,
}

impl<C: InferenceClient> RecommendationAdapter<C> {
    pub fn new(client: C, columns: Columns, guidelines: impl Into<String>) -> Self {
        Self { client, columns, guidelines: guidelines.into() }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: InferenceClient> InferenceAdapter for RecommendationAdapter<C> {
    async fn infer(&self, batch: &Batch<Product>, summary: &CatalogSummary) -> Result<Vec<RecommendationResult>> {
        let request = InferenceRequest {
            prompt: build_prompt(batch.items(), summary, &self.guidelines, &self.columns),
            schema: response_schema(&self.columns),
        };
        let text = match self.client.generate(&request).await {
            Ok(text) => text,
            Err(CallError::Transport(msg)) => {
                tracing::error!(batch = batch.index(), "model transport failure: {}", msg);
                return Err(UpsellError::Transport(msg));
            }
            Err(CallError::Batch(msg)) => {
                tracing::warn!(batch = batch.index(), "model call failed, marking batch: {}", msg);
                return Ok(sentinel_results(batch.items()));
            }
        };
        match parse_response(&text, &self.columns) {
            Ok(parsed) => Ok(align_to_batch(batch, parsed)),
            Err(e) => {
                tracing::warn!(batch = batch.index(), "unusable model response, marking batch: {}", e);
                Ok(sentinel_results(batch.items()))
            }
        }
    }
}

pub fn sentinel_results(products: &[Product]) -> Vec<RecommendationResult> {
    products.iter().map(|p| RecommendationResult::failed(p.child_id.clone())).collect()
}

/// Identifiers may come back as JSON strings or numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Ident {
    Text(String),
    Number(serde_json::Number),
}

impl Ident {
    fn into_string(self) -> String {
        match self {
            Ident::Text(s) => s.trim().to_string(),
            Ident::Number(n) => crate::record::Cell::Number(n).to_string(),
        }
    }
}

/// Parse the model's JSON answer (optionally wrapped in a markdown fence).
/// List lengths are taken as returned.
pub fn parse_response(text: &str, columns: &Columns) -> Result<Vec<RecommendationResult>> {
    let body = strip_code_fence(text);
    let rows: Vec<serde_json::Map<String, Value>> = serde_json::from_str(body)?;
    rows.into_iter()
        .map(|mut row| -> Result<RecommendationResult> {
            let child_id = take_ident(&mut row, &columns.child_id)?;
            let essential = take_ident_list(&mut row, &columns.essential)?;
            let stylistic = take_ident_list(&mut row, &columns.stylistic)?;
            Ok(RecommendationResult::new(child_id, essential, stylistic))
        })
        .collect()
}

fn take_ident(row: &mut serde_json::Map<String, Value>, key: &str) -> Result<String> {
    let v = row
        .remove(key)
        .ok_or_else(|| UpsellError::Validation(format!("response row lacks \"{}\"", key)))?;
    Ok(serde_json::from_value::<Ident>(v)?.into_string())
}

fn take_ident_list(row: &mut serde_json::Map<String, Value>, key: &str) -> Result<Vec<String>> {
    let v = row
        .remove(key)
        .ok_or_else(|| UpsellError::Validation(format!("response row lacks \"{}\"", key)))?;
    let ids: Vec<Ident> = serde_json::from_value(v)?;
    Ok(ids.into_iter().map(Ident::into_string).collect())
}

fn strip_code_fence(text: &str) -> &str {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE.get_or_init(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap());
    match re.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => text.trim(),
    }
}

/// One result per batch product, in batch order. Rows are matched to products
/// by position within each child id; when fewer rows than products came back for
/// a repeated child id, the last row is shared by the rest. Products the model
/// skipped get the sentinel and rows for child ids outside the batch are dropped.
fn align_to_batch(batch: &Batch<Product>, parsed: Vec<RecommendationResult>) -> Vec<RecommendationResult> {
    let mut by_child: AHashMap<String, VecDeque<RecommendationResult>> = AHashMap::with_capacity(parsed.len());
    for r in parsed {
        if batch.iter().any(|p| p.child_id == r.child_id) {
            by_child.entry(r.child_id.clone()).or_default().push_back(r);
        } else {
            tracing::warn!(batch = batch.index(), child_id = %r.child_id, "dropping result for a product outside the batch");
        }
    }
    batch
        .iter()
        .map(|p| {
            let answer = by_child.get_mut(&p.child_id).and_then(|rows| {
                if rows.len() > 1 { rows.pop_front() } else { rows.front().cloned() }
            });
            answer.unwrap_or_else(|| {
                tracing::warn!(batch = batch.index(), child_id = %p.child_id, "model returned no result for product");
                RecommendationResult::failed(p.child_id.clone())
            })
        })
        .collect()
}

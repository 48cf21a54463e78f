mod config;
mod error;
mod record;
mod util;

mod batch;
mod summary;
mod prompt;
mod inference;
mod gemini;
mod cancel;
mod sink;
mod concurrency;
mod progress;

mod sheet;
mod ndjson;
mod export;
mod pipeline;

pub use crate::config::{Columns, UpsellOptions, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY, DEFAULT_MODEL};
pub use crate::error::{CallError, UpsellError};
pub use crate::record::{Cell, Product, Row, Table};
pub use crate::pipeline::{Catalog, UpsellGen};

// Orchestration core: batching, shared context, worker pool, cancellation.
pub use crate::batch::{batch_count, partition, Batch};
pub use crate::summary::{summarize, CatalogSummary};
pub use crate::cancel::CancelSignal;
pub use crate::concurrency::{RunOutcome, RunReport, WorkerPool};

// Inference boundary and the bundled Gemini client.
pub use crate::inference::{
    parse_response, sentinel_results, InferenceAdapter, InferenceClient, InferenceRequest,
    RecommendationAdapter, RecommendationResult, FAILURE_MARKER,
};
pub use crate::prompt::{build_prompt, response_schema, DEFAULT_GUIDELINES, LIST_LEN};
pub use crate::gemini::GeminiClient;

// Sinks and progress helpers.
pub use crate::sink::{CallbackSink, ChannelSink, Progress, ResultCollector, ResultSink, RunEvent};
pub use crate::progress::{make_count_progress, ProgressScope, ProgressSink};

// Spreadsheet collaborator.
pub use crate::sheet::{
    parse_csv, parse_xlsx, read_table, write_csv, write_table, write_xlsx, SheetFormat, HEADER_SCAN_ROWS, XLSX_SHEET_NAME,
};
pub use crate::ndjson::{NdjsonReader, NdjsonWriter};
pub use crate::export::{annotate, existing_recommendations, LIST_SEPARATOR};

pub use crate::util::init_tracing_once;

use crate::prompt::DEFAULT_GUIDELINES;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Names of the catalog columns the pipeline reads and writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Columns {
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub category: String,
    pub essential: String, // "customers also bought"
    pub stylistic: String, // "you may also like"
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            parent_id: "VS Parent ID".to_string(),
            child_id: "VS Child ID".to_string(),
            title: "Parent Product Title".to_string(),
            category: "Categories".to_string(),
            essential: "Upselling 1 (Customers Also Bought)".to_string(),
            stylistic: "Upselling 2 (You May Also Like)".to_string(),
        }
    }
}

impl Columns {
    /// Headers that must be present before a run may start.
    pub fn required(&self) -> [&str; 3] {
        [&self.parent_id, &self.child_id, &self.title]
    }

    /// The two recommendation columns, in output order.
    pub fn recommendation(&self) -> [&str; 2] {
        [&self.essential, &self.stylistic]
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct UpsellOptions {
    pub batch_size: usize,            // products per model call
    pub concurrency: usize,           // model calls in flight
    pub columns: Columns,
    pub model: String,
    pub endpoint: String,             // base URL, no trailing slash
    pub api_key: Option<String>,
    pub temperature: f32,
    pub request_timeout: Duration,    // per call; expiry yields sentinel results
    pub guidelines: String,           // merchandising rules embedded in every prompt
    pub progress: bool,               // show progress bar
    pub progress_label: Option<String>,
}

impl Default for UpsellOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            columns: Columns::default(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            temperature: 0.5,
            request_timeout: Duration::from_secs(120),
            guidelines: DEFAULT_GUIDELINES.to_string(),
            progress: true,
            progress_label: None,
        }
    }
}

impl UpsellOptions {
    /// Defaults overlaid with environment settings:
    /// - UPSELL_API_KEY, GEMINI_API_KEY, API_KEY (first non-empty wins)
    /// - UPSELL_MODEL
    /// - UPSELL_ENDPOINT
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        opts.api_key = ["UPSELL_API_KEY", "GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());
        if let Some(model) = non_empty_env("UPSELL_MODEL") {
            opts.model = model;
        }
        if let Some(endpoint) = non_empty_env("UPSELL_ENDPOINT") {
            opts = opts.with_endpoint(endpoint);
        }
        opts
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }
    pub fn with_columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
    pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
        self.endpoint = endpoint.as_ref().trim().trim_end_matches('/').to_string();
        self
    }
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
        self
    }
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
    pub fn with_guidelines(mut self, text: impl Into<String>) -> Self {
        self.guidelines = text.into();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

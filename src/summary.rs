use crate::record::Product;
use ahash::AHashSet;
use std::fmt;
use std::sync::Arc;

/// Deduplicated "parentId: title" lookup text shared by every model call of a run.
/// Cloning is cheap; the text itself is never copied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogSummary(Arc<str>);

impl CatalogSummary {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn line_count(&self) -> usize {
        if self.0.is_empty() { 0 } else { self.0.lines().count() }
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the summary in first-occurrence order, dropping exact duplicate lines.
pub fn summarize(products: &[Product]) -> CatalogSummary {
    let mut seen = AHashSet::with_capacity(products.len());
    let mut out = String::with_capacity(products.len() * 48);
    for p in products {
        let line = format!("{}: {}", p.parent_id, p.title);
        if !seen.contains(&line) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&line);
            seen.insert(line);
        }
    }
    CatalogSummary(Arc::from(out))
}

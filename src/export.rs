//! Merge recommendation results back into catalog rows, and read them out again.

use crate::config::Columns;
use crate::inference::RecommendationResult;
use crate::record::{Cell, Table};
use ahash::AHashMap;

/// Separator used when joining identifier lists into one cell.
pub const LIST_SEPARATOR: &str = ", ";

/// Copy of `table` with both recommendation columns filled from `results`,
/// keyed by child id. Rows without a result get empty cells; missing
/// recommendation headers are appended, existing ones keep their position.
/// With duplicate child ids in `results`, the last one wins.
pub fn annotate(table: &Table, results: &[RecommendationResult], columns: &Columns) -> Table {
    let by_child: AHashMap<&str, &RecommendationResult> =
        results.iter().map(|r| (r.child_id.as_str(), r)).collect();

    let mut out = table.clone();
    for row in &mut out.rows {
        let child_id = row.text(&columns.child_id);
        match by_child.get(child_id.as_str()) {
            Some(r) => {
                row.set(columns.essential.as_str(), r.essential.join(LIST_SEPARATOR));
                row.set(columns.stylistic.as_str(), r.stylistic.join(LIST_SEPARATOR));
            }
            None => {
                row.set(columns.essential.as_str(), Cell::Empty);
                row.set(columns.stylistic.as_str(), Cell::Empty);
            }
        }
    }
    for h in columns.recommendation() {
        if !out.has_header(h) {
            out.headers.push(h.to_string());
        }
    }
    out
}

/// Recommendations already stored in the sheet, if both columns are present.
/// Rows without a child id are skipped; cells are split on `,` and trimmed.
pub fn existing_recommendations(table: &Table, columns: &Columns) -> Option<Vec<RecommendationResult>> {
    if !columns.recommendation().iter().all(|h| table.has_header(h)) {
        return None;
    }
    let split = |cell: String| -> Vec<String> {
        if cell.is_empty() {
            Vec::new()
        } else {
            cell.split(',').map(|s| s.trim().to_string()).collect()
        }
    };
    Some(
        table
            .rows
            .iter()
            .filter(|row| !row.text(&columns.child_id).is_empty())
            .map(|row| {
                RecommendationResult::new(
                    row.text(&columns.child_id),
                    split(row.text(&columns.essential)),
                    split(row.text(&columns.stylistic)),
                )
            })
            .collect(),
    )
}

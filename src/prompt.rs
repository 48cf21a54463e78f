//! Prompt text and the structured-output schema sent with every model call.

use crate::config::Columns;
use crate::record::Product;
use crate::summary::CatalogSummary;
use serde_json::{json, Value};

/// Number of identifiers requested per recommendation list.
pub const LIST_LEN: usize = 8;

pub const DEFAULT_GUIDELINES: &str = "\
You are an experienced bathroom product merchandiser. Recommendations must be \
practical for the customer and produce a coherent bathroom design.

1. Finish and colour come first. A Brushed Gold product gets Brushed Gold taps, \
wastes, showers and mirrors wherever the catalog has them; the same holds for \
Matt Black, Chrome, Polished White and every other finish.
2. Prefer items from the same product range (Faro accessories for a Faro tap).
3. Keep sizes compatible: mirrors and vanity units close to a basin's width, no \
oversized companions for small items.
4. Product type rules:
   - Basin: always a compatible tap and a waste. Countertop basins take a tall \
monobloc or wall-mounted tap. Titles mentioning \"no overflow\" need an unslotted \
waste, otherwise a slotted waste.
   - Freestanding bath: always a floor-standing bath tap; a wall-mounted filler is \
an acceptable second option.
   - Toilet: a matching seat unless the title says one is included.
   - Shower enclosure: a compatible tray and a shower waste.
   - Shelf, countertop shelves in particular: a countertop basin, a tall monobloc \
or wall-mounted tap, a matching unslotted basin waste, a wall-hung toilet and a \
matching flush plate.";

/// Assemble the full prompt for one batch.
pub fn build_prompt(
    batch: &[Product],
    summary: &CatalogSummary,
    guidelines: &str,
    columns: &Columns,
) -> String {
    let products = serde_json::to_string_pretty(batch).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{guidelines}\n\n\
         IMPORTANT: every recommended identifier MUST be a \"{pid}\" listed in the catalog \
         summary below. Never invent or guess identifiers; an identifier missing from the \
         summary counts as a failure.\n\n\
         Recommendation lists:\n\
         - \"{ess}\": ESSENTIAL companion items the product needs to be installed or used \
         (a basin needs a tap and a waste, a toilet needs a seat).\n\
         - \"{sty}\": STYLISTIC items that complete the look in the same style and finish.\n\n\
         Catalog summary (format \"{pid}: {title}\"):\n---\n{summary}\n---\n\n\
         Using ONLY identifiers from the summary, return exactly {n} \"{pid}\" values in each \
         list for every product of this batch, keyed by its \"{cid}\":\n{products}\n",
        pid = columns.parent_id,
        cid = columns.child_id,
        title = columns.title,
        ess = columns.essential,
        sty = columns.stylistic,
        n = LIST_LEN,
        summary = summary.as_str(),
    )
}

/// JSON schema (Gemini `responseSchema` dialect) for the expected answer.
pub fn response_schema(columns: &Columns) -> Value {
    let id_list = |what: &str| {
        json!({
            "type": "ARRAY",
            "description": format!("Exactly {LIST_LEN} \"{}\" values for {what}.", columns.parent_id),
            "items": { "type": "STRING" },
        })
    };
    let mut properties = serde_json::Map::new();
    properties.insert(
        columns.child_id.clone(),
        json!({ "type": "STRING", "description": "Child identifier of the input product." }),
    );
    properties.insert(columns.essential.clone(), id_list("essential companion products"));
    properties.insert(columns.stylistic.clone(), id_list("complete-the-look products"));
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": properties,
            "required": [columns.child_id, columns.essential, columns.stylistic],
        },
    })
}

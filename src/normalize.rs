//! Shaping raw engine outcomes into the output item stream.

use serde_json::{json, Map, Value as JsonValue};

use crate::batch::SelectOutcome;
use crate::request::{MutationResult, OutputItem, Row};

/// Normalizes a row-query outcome.
///
/// Without a collapse field, every row becomes one item; batches are
/// flattened with fragment order and row order preserved. With a
/// non-blank collapse field, exactly one item is produced whose named
/// field holds the full collection: an array of rows for a single
/// statement, an array of row arrays for a batch.
pub fn normalize_select(outcome: SelectOutcome, collapse_into: Option<&str>) -> Vec<OutputItem> {
    let field = collapse_into.map(str::trim).filter(|f| !f.is_empty());
    match (outcome, field) {
        (SelectOutcome::Single(rows), None) => {
            rows.into_iter().map(JsonValue::Object).collect()
        }
        (SelectOutcome::Single(rows), Some(field)) => {
            vec![single_field_item(field, rows_to_json(rows))]
        }
        (SelectOutcome::Batch(sets), None) => sets
            .into_iter()
            .flatten()
            .map(JsonValue::Object)
            .collect(),
        (SelectOutcome::Batch(sets), Some(field)) => {
            let nested: Vec<JsonValue> = sets.into_iter().map(rows_to_json).collect();
            vec![single_field_item(field, JsonValue::Array(nested))]
        }
    }
}

/// Exactly one item carrying the structured mutation result.
pub fn normalize_mutation(result: &MutationResult) -> Vec<OutputItem> {
    vec![json!({ "changes": result.changes, "last_id": result.last_id })]
}

/// Exactly one item acknowledging a schema command or generic execute.
pub fn normalize_ack() -> Vec<OutputItem> {
    vec![json!({ "success": true })]
}

/// Error surfaced as a normal item when the host continues past per-item
/// failures.
pub fn error_item(message: &str) -> OutputItem {
    json!({ "error": message })
}

fn rows_to_json(rows: Vec<Row>) -> JsonValue {
    JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect())
}

fn single_field_item(field: &str, value: JsonValue) -> OutputItem {
    let mut item = Map::new();
    item.insert(field.to_string(), value);
    JsonValue::Object(item)
}

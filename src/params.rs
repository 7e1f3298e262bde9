//! Parameter reconciliation and pruning.
//!
//! Two independent sources feed the bound parameters of a statement:
//! ordered name/value field pairs and a raw JSON object blob. They are
//! merged into one canonical map per request, then narrowed per statement
//! fragment before binding, because the engine rejects bound parameters
//! the statement does not reference.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::value::Value;

/// Canonical parameter map: sigil-stripped, trimmed name to binding value.
/// Rebuilt fresh for every request.
pub type ParamMap = BTreeMap<String, Value>;

/// Strips at most one leading `@` or `$` sigil, trimming on both sides of
/// the strip. A name without a sigil passes through unchanged.
fn strip_sigil(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix(['@', '$']).unwrap_or(trimmed).trim()
}

/// Merges the two parameter sources into the canonical map.
///
/// Field pairs are inserted first, in host order, skipping blank names.
/// Blob entries are overlaid second and win on name collision; that
/// overlay is the only way an earlier value is overwritten. A malformed
/// blob never fails the request: it degrades to an empty mapping.
pub fn reconcile(field_params: &[(String, String)], blob_json: &str) -> ParamMap {
    let mut map = ParamMap::new();
    for (name, value) in field_params {
        let key = strip_sigil(name);
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), Value::Text(value.clone()));
    }
    for (name, value) in parse_blob(blob_json) {
        let key = strip_sigil(&name);
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), Value::from(value));
    }
    map
}

fn parse_blob(raw: &str) -> serde_json::Map<String, JsonValue> {
    if raw.trim().is_empty() {
        return serde_json::Map::new();
    }
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(entries)) => entries,
        Ok(other) => {
            debug!(kind = %json_kind(&other), "parameter blob is not a JSON object, ignoring");
            serde_json::Map::new()
        }
        Err(err) => {
            debug!(%err, "parameter blob failed to parse, ignoring");
            serde_json::Map::new()
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Returns the subset of the canonical map whose keys appear anywhere in
/// the fragment text. Textual containment, not tokenization: a key that is
/// a substring of an unrelated identifier is still kept. The point is only
/// to avoid binding parameters the engine would reject as unreferenced.
pub fn prune<'a>(fragment: &str, params: &'a ParamMap) -> Vec<(&'a String, &'a Value)> {
    params
        .iter()
        .filter(|(key, _)| fragment.contains(key.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn blob_wins_on_name_collision() {
        let fields = pairs(&[("v", "from-fields"), ("w", "kept")]);
        let map = reconcile(&fields, r#"{"v": "from-blob"}"#);
        assert_eq!(map["v"], Value::Text("from-blob".to_string()));
        assert_eq!(map["w"], Value::Text("kept".to_string()));
    }

    #[test]
    fn sigils_are_stripped_from_both_sources() {
        let fields = pairs(&[("@a", "1"), ("$b", "2")]);
        let map = reconcile(&fields, r#"{"@c": 3, "$d": 4}"#);
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn at_most_one_sigil_is_stripped() {
        let fields = pairs(&[("@@twice", "x"), ("plain", "y")]);
        let map = reconcile(&fields, "");
        assert!(map.contains_key("@twice"));
        assert!(map.contains_key("plain"));
    }

    #[test]
    fn blank_and_sigil_only_names_are_skipped() {
        let fields = pairs(&[("", "a"), ("   ", "b"), ("@", "c"), ("$  ", "d")]);
        assert!(reconcile(&fields, "").is_empty());
    }

    #[test]
    fn malformed_blob_degrades_to_fields_only() {
        let fields = pairs(&[("v", "1")]);
        let map = reconcile(&fields, "{not json");
        assert_eq!(map.len(), 1);
        assert_eq!(map["v"], Value::Text("1".to_string()));
    }

    #[test]
    fn non_object_blob_is_ignored() {
        let fields = pairs(&[("v", "1")]);
        let map = reconcile(&fields, "[1, 2, 3]");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn blob_values_keep_their_json_types() {
        let map = reconcile(&[], r#"{"n": 2, "f": 0.5, "b": true, "s": "t", "z": null}"#);
        assert_eq!(map["n"], Value::Integer(2));
        assert_eq!(map["f"], Value::Real(0.5));
        assert_eq!(map["b"], Value::Boolean(true));
        assert_eq!(map["s"], Value::Text("t".to_string()));
        assert_eq!(map["z"], Value::Null);
    }

    #[test]
    fn composite_blob_values_coerce_to_text() {
        let map = reconcile(&[], r#"{"list": [1, 2]}"#);
        assert_eq!(map["list"], Value::Text("[1,2]".to_string()));
    }

    #[test]
    fn prune_drops_unreferenced_keys() {
        let mut map = ParamMap::new();
        map.insert("used".to_string(), Value::Integer(1));
        map.insert("unused".to_string(), Value::Integer(2));
        let kept = prune("SELECT * FROM t WHERE id = @used", &map);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0, "used");
    }

    #[test]
    fn prune_is_textual_containment() {
        // A key inside an unrelated identifier is still kept.
        let mut map = ParamMap::new();
        map.insert("id".to_string(), Value::Integer(1));
        let kept = prune("SELECT ident FROM t", &map);
        assert_eq!(kept.len(), 1);
    }
}

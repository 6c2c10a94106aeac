use crate::model::EntityConfig;
use serde_json::Value as JsonValue;

pub fn entity_key(e: &EntityConfig) -> String {
    format!("entity:{}", e.id)
}

/// Scalar id of a record row under `id_key`, stringified.
pub fn record_id(v: &JsonValue, id_key: &str) -> Option<String> {
    match v.get(id_key)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn record_key(parent_key: &str, v: &JsonValue, id_key: &str, idx: usize) -> String {
    match record_id(v, id_key) {
        Some(id) => format!("{parent_key}/{id}"),
        None => format!("{parent_key}/#{idx}"),
    }
}

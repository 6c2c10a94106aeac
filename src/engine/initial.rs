use super::{EntityProfile, FormContext, FormState, FormValue};
use crate::schema::path::FieldPath;
use crate::schema::{FieldKind, FieldSpec};
use serde_json::Value as JsonValue;

/// Seed the flat form state from `record` (edit) or from schema defaults
/// (create). Every leaf in `fields` gets an entry; context seeds are applied
/// last and may add keys the schema does not render.
pub fn build_initial_state(
    fields: &[&FieldSpec],
    record: Option<&JsonValue>,
    profile: &EntityProfile,
    ctx: &FormContext,
) -> FormState {
    let mut state = FormState::default();
    for f in fields {
        let path = profile.target_path(&f.name);
        let found = record.and_then(|r| lookup(r, &f.name, profile));
        let value = found
            .and_then(|v| convert(v, &f.kind, path, profile))
            .or_else(|| {
                f.default_value
                    .as_ref()
                    .and_then(|d| convert(d, &f.kind, path, profile))
            })
            .unwrap_or_else(|| empty_for(&f.kind));
        state.set(f.name.clone(), value);
    }
    for (k, v) in &ctx.seed {
        state.set(k.clone(), FormValue::text(v.clone()));
    }
    state
}

fn empty_for(kind: &FieldKind) -> FormValue {
    if kind.is_chip() {
        FormValue::List(Vec::new())
    } else {
        FormValue::text("")
    }
}

/// Literal key first (`record["theming.primaryColor"]`), then the aliased
/// dot path into nested objects.
fn lookup<'a>(record: &'a JsonValue, name: &str, profile: &EntityProfile) -> Option<&'a JsonValue> {
    if let Some(v) = record.get(name) {
        if !v.is_null() {
            return Some(v);
        }
    }
    FieldPath::parse(profile.target_path(name))
        .get(record)
        .filter(|v| !v.is_null())
}

fn convert(v: &JsonValue, kind: &FieldKind, path: &str, profile: &EntityProfile) -> Option<FormValue> {
    if kind.is_chip() {
        return match v {
            JsonValue::Array(items) => Some(FormValue::List(
                items.iter().filter_map(scalar_text).collect(),
            )),
            JsonValue::String(s) if s.is_empty() => Some(FormValue::List(Vec::new())),
            other => scalar_text(other).map(|s| FormValue::List(vec![s])),
        };
    }
    match v {
        JsonValue::Array(items) => {
            let item_key = profile.list_item_key(path);
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match (item, item_key) {
                    (JsonValue::Object(_), Some(k)) => item.get(k).and_then(scalar_text),
                    _ => scalar_text(item),
                })
                .collect();
            Some(FormValue::Text(parts.join(", ")))
        }
        JsonValue::Object(_) => None,
        other => scalar_text(other).map(FormValue::Text),
    }
}

fn scalar_text(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

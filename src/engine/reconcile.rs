use super::{EntityProfile, FormContext, FormState, FormValue, DEFAULT_DOMAIN_TEMPLATE};
use crate::schema::path::FieldPath;
use crate::schema::Mode;
use serde_json::{Map, Number, Value as JsonValue};

/// Rebuild the nested request payload from flat form state.
///
/// Dotted names and profile aliases are expanded into nested objects, list
/// fields are split on commas, profile defaults fill blank scalars, and the
/// payload is shaped for `mode` before empty values are pruned. Never fails:
/// values that do not convert are dropped.
pub fn reconcile(
    state: &FormState,
    profile: &EntityProfile,
    mode: Mode,
    ctx: &FormContext,
) -> JsonValue {
    let mut payload = JsonValue::Object(Map::new());

    for (key, value) in state.iter() {
        if incomplete_pair(key, state, profile) {
            continue;
        }
        let json = match value {
            FormValue::List(items) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            }
            FormValue::Text(s) if profile.is_list(key) => {
                split_list(s, profile.is_numeric_list(key))
            }
            FormValue::Text(s) => scalar(key, s, profile),
        };
        FieldPath::parse(profile.target_path(key)).insert(&mut payload, json);
    }

    // Defaults for keys the form never rendered (role tenant_code).
    for (key, default) in profile.defaults {
        if !state.contains(key) {
            FieldPath::parse(profile.target_path(key))
                .insert(&mut payload, scalar(key, default, profile));
        }
    }

    match mode {
        Mode::Edit => {
            for path in profile.edit_omits {
                FieldPath::parse(path).remove(&mut payload);
            }
            if profile.include_id_on_edit {
                if let Some(id) = ctx.record_id.as_deref() {
                    FieldPath::parse("id")
                        .insert(&mut payload, JsonValue::String(id.to_string()));
                }
            }
        }
        Mode::Create => {
            for path in profile.create_omits {
                FieldPath::parse(path).remove(&mut payload);
            }
            if profile.default_domain {
                fill_default_domain(&mut payload, state, ctx);
            }
        }
    }

    prune(&mut payload);
    payload
}

fn split_list(raw: &str, numeric: bool) -> JsonValue {
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if numeric {
                s.parse::<i64>().ok().map(|n| JsonValue::Number(n.into()))
            } else {
                Some(JsonValue::String(s.to_string()))
            }
        })
        .collect();
    JsonValue::Array(items)
}

fn scalar(key: &str, raw: &str, profile: &EntityProfile) -> JsonValue {
    let raw = if profile.is_trimmed(key) { raw.trim() } else { raw };
    let raw = if raw.is_empty() {
        profile.default_for(key).unwrap_or("")
    } else {
        raw
    };
    if profile.is_numeric(key) {
        return parse_number(raw.trim()).unwrap_or(JsonValue::Null);
    }
    JsonValue::String(raw.to_string())
}

fn parse_number(s: &str) -> Option<JsonValue> {
    if let Ok(n) = s.parse::<i64>() {
        return Some(JsonValue::Number(n.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(JsonValue::Number)
}

fn incomplete_pair(key: &str, state: &FormState, profile: &EntityProfile) -> bool {
    profile.pair_of(key).is_some_and(|set| {
        set.iter()
            .any(|k| state.get(k).map_or(true, |v| v.as_text().trim().is_empty()))
    })
}

fn fill_default_domain(payload: &mut JsonValue, state: &FormState, ctx: &FormContext) {
    let has_domain = payload
        .get("domains")
        .and_then(JsonValue::as_array)
        .map(|a| a.iter().any(|d| d.as_str().map(|s| !s.is_empty()).unwrap_or(true)))
        .unwrap_or(false);
    let code = state.text("code");
    if has_domain || code.trim().is_empty() {
        return;
    }
    let template = ctx
        .default_domain_template
        .as_deref()
        .unwrap_or(DEFAULT_DOMAIN_TEMPLATE);
    let domain = template.replace("{code}", code.trim());
    tracing::debug!(%domain, "no domain entered; using default");
    FieldPath::parse("domains").insert(payload, JsonValue::Array(vec![JsonValue::String(domain)]));
}

/// Drop `""`, `null`, empty arrays and objects left empty, recursively.
/// The root object itself is kept even when everything was pruned.
pub fn prune(v: &mut JsonValue) {
    match v {
        JsonValue::Object(map) => {
            for child in map.values_mut() {
                prune(child);
            }
            map.retain(|_, child| !is_empty_value(child));
        }
        JsonValue::Array(items) => {
            for child in items.iter_mut() {
                prune(child);
            }
            items.retain(|child| !is_empty_value(child));
        }
        _ => {}
    }
}

fn is_empty_value(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(m) => m.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::profile::{GENERIC, ORGANIZATION, ROLE, TENANT};
    use serde_json::json;

    fn state(pairs: &[(&str, FormValue)]) -> FormState {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn dotted_names_nest_and_lists_split() {
        let s = state(&[
            ("theming.primaryColor", FormValue::text("#111111")),
            ("theming.secondaryColor", FormValue::text("")),
            ("domains", FormValue::text("a.com, b.com")),
        ]);
        let out = reconcile(&s, &GENERIC, Mode::Create, &FormContext::default());
        assert_eq!(
            out,
            json!({"theming": {"primaryColor": "#111111"}, "domains": ["a.com", "b.com"]})
        );
    }

    #[test]
    fn all_blank_state_prunes_to_empty_object() {
        let s = state(&[
            ("name", FormValue::text("")),
            ("meta.tags", FormValue::text(" , ")),
            ("theming.primaryColor", FormValue::text("")),
            ("langs", FormValue::List(vec![])),
        ]);
        let out = reconcile(&s, &GENERIC, Mode::Create, &FormContext::default());
        assert_eq!(out, json!({}));
    }

    #[test]
    fn numeric_lists_drop_unparsable_items() {
        let s = state(&[("related_orgs", FormValue::text("12, x, 15,"))]);
        let out = reconcile(&s, &GENERIC, Mode::Edit, &FormContext::default());
        assert_eq!(out, json!({"related_orgs": [12, 15]}));
    }

    #[test]
    fn organization_edit_omits_identity_fields() {
        let s = state(&[
            ("name", FormValue::text("Acme")),
            ("code", FormValue::text("acme")),
            ("tenant_code", FormValue::text("t1")),
            ("related_orgs", FormValue::text("3")),
        ]);
        let ctx = FormContext {
            record_id: Some("42".into()),
            ..Default::default()
        };
        let out = reconcile(&s, &ORGANIZATION, Mode::Edit, &ctx);
        assert_eq!(out, json!({"name": "Acme", "related_orgs": [3]}));
    }

    #[test]
    fn organization_create_omits_update_only_fields() {
        let s = state(&[
            ("name", FormValue::text("Acme")),
            ("code", FormValue::text("acme")),
            ("related_orgs", FormValue::text("3")),
            ("meta.tags", FormValue::text("x")),
        ]);
        let out = reconcile(&s, &ORGANIZATION, Mode::Create, &FormContext::default());
        assert_eq!(out, json!({"name": "Acme", "code": "acme"}));
    }

    #[test]
    fn tenant_aliases_and_default_domain() {
        let s = state(&[
            ("code", FormValue::text("acme")),
            ("theme.primaryColor", FormValue::text("#4F46E5")),
            ("domain", FormValue::text("")),
        ]);
        let ctx = FormContext {
            default_domain_template: Some("https://{code}.shiksha.test".into()),
            ..Default::default()
        };
        let out = reconcile(&s, &TENANT, Mode::Create, &ctx);
        assert_eq!(
            out,
            json!({
                "code": "acme",
                "theming": {"primaryColor": "#4F46E5"},
                "domains": ["https://acme.shiksha.test"]
            })
        );
    }

    #[test]
    fn tenant_entered_domain_wins_and_code_is_dropped_on_edit() {
        let s = state(&[
            ("code", FormValue::text("acme")),
            ("domain", FormValue::text("acme.org")),
        ]);
        let out = reconcile(&s, &TENANT, Mode::Edit, &FormContext::default());
        assert_eq!(out, json!({"domains": ["acme.org"]}));
    }

    #[test]
    fn role_defaults_numbers_and_nested_translations() {
        let s = state(&[
            ("title", FormValue::text("mentor")),
            ("user_type", FormValue::text("")),
            ("status", FormValue::text("")),
            ("organization_id", FormValue::text("9")),
            ("translations.en.title", FormValue::text("Mentor")),
            ("entityTypeId", FormValue::text("3")),
            ("entityType", FormValue::text("school")),
        ]);
        let ctx = FormContext {
            record_id: Some("17".into()),
            ..Default::default()
        };
        let out = reconcile(&s, &ROLE, Mode::Edit, &ctx);
        assert_eq!(
            out,
            json!({
                "id": "17",
                "title": "mentor",
                "user_type": 0,
                "status": "ACTIVE",
                "visibility": "PUBLIC",
                "tenant_code": "default",
                "organization_id": 9,
                "translations": {"en": {"title": "Mentor"}},
                "meta": {"entityTypes": [{"entityTypeId": "3", "entityType": "school"}]}
            })
        );
    }

    #[test]
    fn role_entity_type_needs_both_halves() {
        let s = state(&[
            ("title", FormValue::text("mentor")),
            ("entityTypeId", FormValue::text("3")),
            ("entityType", FormValue::text("")),
        ]);
        let out = reconcile(&s, &ROLE, Mode::Create, &FormContext::default());
        assert!(out.get("meta").is_none(), "partial entity type leaked: {out}");
        assert_eq!(out["title"], json!("mentor"));
    }

    #[test]
    fn role_translations_are_trimmed_and_blank_ones_dropped() {
        let s = state(&[
            ("translations.en.title", FormValue::text("  Mentor ")),
            ("translations.hi.title", FormValue::text("   ")),
        ]);
        let out = reconcile(&s, &ROLE, Mode::Create, &FormContext::default());
        assert_eq!(out["translations"], json!({"en": {"title": "Mentor"}}));
    }

    #[test]
    fn role_edit_id_is_a_string_even_when_numeric() {
        let s = state(&[("title", FormValue::text("mentor"))]);
        let ctx = FormContext {
            record_id: Some("42".into()),
            ..Default::default()
        };
        let out = reconcile(&s, &ROLE, Mode::Edit, &ctx);
        assert_eq!(out["id"], json!("42"));
        let out = reconcile(&s, &ROLE, Mode::Create, &ctx);
        assert!(out.get("id").is_none());
    }

    #[test]
    fn unparsable_numeric_scalar_is_dropped() {
        let s = state(&[("organization_id", FormValue::text("abc"))]);
        let out = reconcile(&s, &ROLE, Mode::Create, &FormContext::default());
        assert!(out.get("organization_id").is_none());
    }

    #[test]
    fn chip_lists_are_copied_verbatim() {
        let s = state(&[("meta.languages", FormValue::List(vec!["en".into(), "hi".into()]))]);
        let out = reconcile(&s, &TENANT, Mode::Edit, &FormContext::default());
        assert_eq!(out, json!({"meta": {"languages": ["en", "hi"]}}));
    }
}

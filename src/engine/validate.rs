use super::{FormState, ValidationErrors};
use crate::schema::FieldSpec;
use regex::Regex;

const REQUIRED_DEFAULT: &str = "This field is required";
const PATTERN_DEFAULT: &str = "Invalid format";

/// Check `fields` (the leaves visible in the current mode) against `state`.
/// The required rule runs first; the pattern only applies to non-blank
/// values, so optional patterned fields may be left empty.
pub fn validate(fields: &[&FieldSpec], state: &FormState) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    for f in fields {
        let value = state.get(&f.name).cloned().unwrap_or_default();
        if f.validators.required && value.is_blank() {
            let msg = f
                .error_message
                .required
                .clone()
                .unwrap_or_else(|| REQUIRED_DEFAULT.to_string());
            errors.insert(f.name.clone(), msg);
            continue;
        }
        let Some(pattern) = f.validators.pattern.as_deref() else {
            continue;
        };
        if value.is_blank() {
            continue;
        }
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(field = %f.name, pattern, error = %e, "ignoring invalid validation pattern");
                continue;
            }
        };
        if !re.is_match(&value.as_text()) {
            let msg = f
                .error_message
                .pattern
                .clone()
                .unwrap_or_else(|| PATTERN_DEFAULT.to_string());
            errors.insert(f.name.clone(), msg);
        }
    }
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "form validation failed");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FormValue;
    use crate::schema::{flatten_fields, FormSchema};
    use serde_json::json;

    fn schema(v: serde_json::Value) -> FormSchema {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn required_blank_uses_override_or_default_message() {
        let s = schema(json!({"data": [
            {"name": "name", "type": "text", "validators": {"required": true}},
            {"name": "code", "type": "text", "validators": {"required": true},
             "errorMessage": {"required": "Code please"}},
            {"name": "tags", "type": "chip", "validators": {"required": true}}
        ]}));
        let flat = flatten_fields(&s.data);
        let state: FormState = [
            ("name", FormValue::text("")),
            ("code", FormValue::text("")),
            ("tags", FormValue::List(vec![])),
        ]
        .into_iter()
        .collect();
        let errs = validate(&flat, &state);
        assert_eq!(errs.get("name"), Some("This field is required"));
        assert_eq!(errs.get("code"), Some("Code please"));
        assert_eq!(errs.get("tags"), Some("This field is required"));
    }

    #[test]
    fn pattern_mismatch_and_match() {
        let s = schema(json!({"data": [
            {"name": "code", "type": "text", "validators": {"pattern": "^[a-z]+$"}}
        ]}));
        let flat = flatten_fields(&s.data);
        let bad: FormState = [("code", FormValue::text("ABC"))].into_iter().collect();
        assert_eq!(validate(&flat, &bad).get("code"), Some("Invalid format"));
        let good: FormState = [("code", FormValue::text("abc"))].into_iter().collect();
        assert!(validate(&flat, &good).is_empty());
    }

    #[test]
    fn pattern_is_skipped_for_blank_optional_values() {
        let s = schema(json!({"data": [
            {"name": "logo", "type": "text", "validators": {"pattern": "^https?://"}}
        ]}));
        let flat = flatten_fields(&s.data);
        let state: FormState = [("logo", FormValue::text(""))].into_iter().collect();
        assert!(validate(&flat, &state).is_empty());
    }

    #[test]
    fn list_values_are_joined_before_pattern_match() {
        let s = schema(json!({"data": [
            {"name": "langs", "type": "chip", "validators": {"pattern": "^[a-z]+(,[a-z]+)*$"}}
        ]}));
        let flat = flatten_fields(&s.data);
        let state: FormState = [("langs", FormValue::List(vec!["en".into(), "hi".into()]))]
            .into_iter()
            .collect();
        assert!(validate(&flat, &state).is_empty());
    }

    #[test]
    fn invalid_regex_does_not_block_submit() {
        let s = schema(json!({"data": [
            {"name": "x", "type": "text", "validators": {"pattern": "([a-z"}}
        ]}));
        let flat = flatten_fields(&s.data);
        let state: FormState = [("x", FormValue::text("anything"))].into_iter().collect();
        assert!(validate(&flat, &state).is_empty());
    }
}

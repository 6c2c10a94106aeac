//! Declarative form schemas: a tree of groups and input fields loaded from
//! bundled JSON documents (one per entity kind).

pub mod assets;
pub mod path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

pub use assets::load_schema;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no schema bundled for '{0}'")]
    Missing(String),

    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed schema '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate field name '{0}' in schema")]
    DuplicateField(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Create,
    Edit,
}

impl Mode {
    pub fn verb(self) -> &'static str {
        match self {
            Mode::Create => "create",
            Mode::Edit => "update",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Tenant,
    Role,
}

impl EntityKind {
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Tenant => "tenant",
            EntityKind::Role => "role",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            EntityKind::Organization => "Organization",
            EntityKind::Tenant => "Tenant",
            EntityKind::Role => "Role",
        }
    }
}

/// Option of a select/chip field. Schemas use either bare strings or
/// `{value, label}` objects.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldOption {
    Literal(String),
    Pair {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },
}

impl FieldOption {
    pub fn value(&self) -> &str {
        match self {
            FieldOption::Literal(s) => s,
            FieldOption::Pair { value, label } => value
                .as_deref()
                .filter(|v| !v.is_empty())
                .or(label.as_deref())
                .unwrap_or(""),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldOption::Literal(s) => s,
            FieldOption::Pair { value, label } => label
                .as_deref()
                .filter(|l| !l.is_empty())
                .or(value.as_deref())
                .unwrap_or(""),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Validators {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ErrorMessages {
    #[serde(default)]
    pub required: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Text,
    TextArea,
    Color,
    Select { options: Vec<FieldOption> },
    Chip { options: Vec<FieldOption> },
    Group { fields: Vec<FieldSpec> },
    Unknown(String),
}

impl FieldKind {
    pub fn is_chip(&self) -> bool {
        matches!(self, FieldKind::Chip { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawFieldSpec")]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub kind: FieldKind,
    pub validators: Validators,
    pub error_message: ErrorMessages,
    pub show_on_mode: Option<Vec<Mode>>,
    pub read_only_on_mode: Option<Vec<Mode>>,
    pub default_value: Option<JsonValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldSpec {
    #[serde(default)]
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default, alias = "placeHolder")]
    placeholder: Option<String>,
    #[serde(default, rename = "type")]
    type_tag: Option<String>,
    #[serde(default)]
    options: Vec<FieldOption>,
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    validators: Option<Validators>,
    #[serde(default)]
    error_message: Option<ErrorMessages>,
    #[serde(default)]
    show_on_mode: Option<Vec<Mode>>,
    #[serde(default)]
    read_only_on_mode: Option<Vec<Mode>>,
    #[serde(default)]
    default_value: Option<JsonValue>,
}

impl From<RawFieldSpec> for FieldSpec {
    fn from(raw: RawFieldSpec) -> Self {
        let tag = raw.type_tag.unwrap_or_default().to_ascii_lowercase();
        let kind = match tag.as_str() {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::TextArea,
            "color" => FieldKind::Color,
            "select" => FieldKind::Select {
                options: raw.options,
            },
            "chip" => FieldKind::Chip {
                options: raw.options,
            },
            "group" => FieldKind::Group { fields: raw.fields },
            _ => FieldKind::Unknown(tag),
        };
        Self {
            name: raw.name,
            label: raw.label,
            placeholder: raw.placeholder,
            kind,
            validators: raw.validators.unwrap_or_default(),
            error_message: raw.error_message.unwrap_or_default(),
            show_on_mode: raw.show_on_mode,
            read_only_on_mode: raw.read_only_on_mode,
            default_value: raw.default_value,
        }
    }
}

impl FieldSpec {
    pub fn visible_in(&self, mode: Mode) -> bool {
        self.show_on_mode
            .as_ref()
            .map(|modes| modes.contains(&mode))
            .unwrap_or(true)
    }

    pub fn read_only_in(&self, mode: Mode) -> bool {
        self.read_only_on_mode
            .as_ref()
            .map(|modes| modes.contains(&mode))
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormSchema {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub data: Vec<FieldSpec>,
}

/// A labelled block of leaf fields as shown in the dialog.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub label: Option<String>,
    pub fields: Vec<FieldSpec>,
}

/// Depth-first, order-preserving list of editable leaves. Groups are
/// unwrapped; fields of an unknown type are not editable and are skipped.
pub fn flatten_fields(fields: &[FieldSpec]) -> Vec<&FieldSpec> {
    let mut out = Vec::new();
    collect_leaves(fields, None, &mut out);
    out
}

fn collect_leaves<'a>(fields: &'a [FieldSpec], mode: Option<Mode>, out: &mut Vec<&'a FieldSpec>) {
    for f in fields {
        if let Some(m) = mode {
            if !f.visible_in(m) {
                continue;
            }
        }
        match &f.kind {
            FieldKind::Group { fields } => collect_leaves(fields, mode, out),
            FieldKind::Unknown(tag) => {
                tracing::debug!(field = %f.name, kind = %tag, "skipping field of unknown type");
            }
            _ => out.push(f),
        }
    }
}

/// Sections visible in `mode`: each top-level group becomes one section,
/// consecutive top-level leaves share an unlabelled one.
pub fn visible_sections(schema: &FormSchema, mode: Mode) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for node in &schema.data {
        if !node.visible_in(mode) {
            continue;
        }
        match &node.kind {
            FieldKind::Group { fields } => {
                let mut leaves = Vec::new();
                collect_leaves(fields, Some(mode), &mut leaves);
                if leaves.is_empty() {
                    continue;
                }
                sections.push(Section {
                    label: Some(node.label.clone()),
                    fields: leaves.into_iter().cloned().collect(),
                });
            }
            FieldKind::Unknown(_) => {}
            _ => match sections.last_mut() {
                Some(last) if last.label.is_none() => last.fields.push(node.clone()),
                _ => sections.push(Section {
                    label: None,
                    fields: vec![node.clone()],
                }),
            },
        }
    }
    sections
}

pub fn check_unique_names(fields: &[&FieldSpec]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for f in fields {
        if !seen.insert(f.name.as_str()) {
            return Err(SchemaError::DuplicateField(f.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(v: JsonValue) -> FormSchema {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn flatten_leaves_only_list_unchanged() {
        let s = schema(json!({"data": [
            {"name": "a", "type": "text"},
            {"name": "b", "type": "select", "options": ["x"]},
            {"name": "c", "type": "chip", "options": []}
        ]}));
        let names: Vec<&str> = flatten_fields(&s.data).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn flatten_nested_groups_depth_first() {
        let s = schema(json!({"data": [
            {"type": "group", "label": "One", "fields": [
                {"name": "a", "type": "text"},
                {"type": "group", "label": "Inner", "fields": [
                    {"name": "b", "type": "color"}
                ]},
                {"name": "c", "type": "textarea"}
            ]},
            {"type": "group", "label": "Empty", "fields": []},
            {"name": "d", "type": "text"}
        ]}));
        let flat = flatten_fields(&s.data);
        let names: Vec<&str> = flat.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert!(flat
            .iter()
            .all(|f| !matches!(f.kind, FieldKind::Group { .. })));
    }

    #[test]
    fn unknown_and_missing_types_are_not_editable() {
        let s = schema(json!({"data": [
            {"name": "a", "type": "slider"},
            {"name": "b"},
            {"name": "c", "type": "Text"}
        ]}));
        assert!(matches!(s.data[0].kind, FieldKind::Unknown(ref t) if t == "slider"));
        assert!(matches!(s.data[1].kind, FieldKind::Unknown(ref t) if t.is_empty()));
        let names: Vec<&str> = flatten_fields(&s.data).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["c"]);
    }

    #[test]
    fn options_fall_back_between_value_and_label() {
        let s = schema(json!({"data": [
            {"name": "s", "type": "select", "options": [
                "plain",
                {"value": "v", "label": "Label"},
                {"label": "OnlyLabel"},
                {"value": "OnlyValue"}
            ]}
        ]}));
        let FieldKind::Select { options: opts } = &s.data[0].kind else {
            panic!("expected a select, got {:?}", s.data[0].kind);
        };
        assert_eq!((opts[0].value(), opts[0].label()), ("plain", "plain"));
        assert_eq!((opts[1].value(), opts[1].label()), ("v", "Label"));
        assert_eq!((opts[2].value(), opts[2].label()), ("OnlyLabel", "OnlyLabel"));
        assert_eq!((opts[3].value(), opts[3].label()), ("OnlyValue", "OnlyValue"));
    }

    #[test]
    fn legacy_placeholder_key_and_camel_case_fields() {
        let s = schema(json!({"data": [
            {"name": "code", "type": "text", "placeHolder": "acme",
             "validators": {"required": true, "pattern": "^[a-z]+$"},
             "errorMessage": {"required": "Code please"},
             "readOnlyOnMode": ["edit"]}
        ]}));
        let f = &s.data[0];
        assert_eq!(f.placeholder.as_deref(), Some("acme"));
        assert!(f.validators.required);
        assert_eq!(f.error_message.required.as_deref(), Some("Code please"));
        assert!(f.read_only_in(Mode::Edit));
        assert!(!f.read_only_in(Mode::Create));
    }

    #[test]
    fn sections_respect_show_on_mode() {
        let s = schema(json!({"data": [
            {"type": "group", "label": "Basic", "fields": [
                {"name": "name", "type": "text"},
                {"name": "code", "type": "text", "showOnMode": ["create"]}
            ]},
            {"type": "group", "label": "Related", "showOnMode": ["edit"], "fields": [
                {"name": "related_orgs", "type": "text"}
            ]}
        ]}));
        let create = visible_sections(&s, Mode::Create);
        assert_eq!(create.len(), 1);
        assert_eq!(create[0].fields.len(), 2);
        let edit = visible_sections(&s, Mode::Edit);
        assert_eq!(edit.len(), 2);
        assert_eq!(edit[0].fields.len(), 1);
        assert_eq!(edit[1].label.as_deref(), Some("Related"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let s = schema(json!({"data": [
            {"name": "a", "type": "text"},
            {"type": "group", "fields": [{"name": "a", "type": "color"}]}
        ]}));
        let flat = flatten_fields(&s.data);
        match check_unique_names(&flat) {
            Err(SchemaError::DuplicateField(n)) => assert_eq!(n, "a"),
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }
}

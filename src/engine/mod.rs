//! Form engine: flat state seeded from a domain record, validation, and
//! reassembly of the nested payload the API expects.

pub mod initial;
pub mod profile;
pub mod reconcile;
pub mod reducer;
pub mod validate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use initial::build_initial_state;
pub use profile::EntityProfile;
pub use reconcile::reconcile;
pub use reducer::{update, FormAction, FormEvent, FormSession};
pub use validate::validate;

/// Severity of a user-facing notice raised by the form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Text(String),
    List(Vec<String>),
}

impl Default for FormValue {
    fn default() -> Self {
        FormValue::Text(String::new())
    }
}

impl FormValue {
    pub fn text(s: impl Into<String>) -> Self {
        FormValue::Text(s.into())
    }

    /// Blank means "falsy" for required checks and pruning.
    pub fn is_blank(&self) -> bool {
        match self {
            FormValue::Text(s) => s.is_empty(),
            FormValue::List(v) => v.is_empty(),
        }
    }

    /// String coercion used for pattern checks and display.
    pub fn as_text(&self) -> String {
        match self {
            FormValue::Text(s) => s.clone(),
            FormValue::List(v) => v.join(","),
        }
    }
}

/// Flat `field name -> value` map backing the rendered controls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    values: BTreeMap<String, FormValue>,
}

impl FormState {
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> String {
        self.values.get(name).map(FormValue::as_text).unwrap_or_default()
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        match self.values.get(name) {
            Some(FormValue::List(v)) => v.clone(),
            _ => Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: FormValue) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FormValue)> {
        self.values.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, FormValue)> for FormState {
    fn from_iter<I: IntoIterator<Item = (K, FormValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Per-field error messages; an absent key means the field is valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn insert(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(name.into(), message.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn clear_field(&mut self, name: &str) {
        self.errors.remove(name);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

/// What the caller knows that the schema does not: the record being edited,
/// values picked elsewhere in the UI (tenant, organization), and the
/// default-domain template from config.
#[derive(Clone, Debug, Default)]
pub struct FormContext {
    pub record_id: Option<String>,
    pub seed: BTreeMap<String, String>,
    pub default_domain_template: Option<String>,
}

pub const DEFAULT_DOMAIN_TEMPLATE: &str = "https://{code}.example.org";

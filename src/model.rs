use crate::schema::EntityKind;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Clone)]
pub struct EntityConfig {
    pub id: String,
    pub title: String,
    pub kind: EntityKind,
    // Optional schema override, relative to the config directory
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub list_cmd: Option<String>,
    // Dot path to the record array in list_cmd output (default: "result")
    #[serde(default)]
    pub list_unwrap: Option<String>,
    // Full record fetch for edit; ${RECORD_ID} is expanded
    #[serde(default)]
    pub read_cmd: Option<String>,
    #[serde(default)]
    pub read_unwrap: Option<String>,
    #[serde(default)]
    pub create_cmd: Option<String>,
    #[serde(default)]
    pub update_cmd: Option<String>,
    // Seed values applied on top of the initial form state
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl EntityConfig {
    #[cfg(test)]
    pub fn new(id: &str, kind: EntityKind) -> Self {
        Self {
            id: id.to_string(),
            title: kind.title().to_string(),
            kind,
            schema: None,
            list_cmd: None,
            list_unwrap: None,
            read_cmd: None,
            read_unwrap: None,
            create_cmd: None,
            update_cmd: None,
            context: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_title")]
    pub title: String,
    // `{code}` is replaced with the tenant code when no domain was entered
    #[serde(default)]
    pub default_domain_template: Option<String>,
    pub entities: Vec<EntityConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            default_domain_template: None,
            entities: vec![],
        }
    }
}

fn default_title() -> String {
    "Tenant Admin".to_string()
}

pub(crate) fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    use std::collections::HashSet;
    let mut ids = HashSet::new();
    for (i, e) in cfg.entities.iter().enumerate() {
        if e.id.trim().is_empty() {
            return Err(format!("entity at index {i} has an empty id"));
        }
        if !ids.insert(&e.id) {
            return Err(format!("duplicate entity id: '{}' at index {}", e.id, i));
        }
        let has_submit = [&e.create_cmd, &e.update_cmd]
            .iter()
            .any(|c| c.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false));
        if !has_submit {
            return Err(format!(
                "entity '{}' must specify create_cmd or update_cmd",
                e.id
            ));
        }
        if e.update_cmd.is_some() && e.list_cmd.is_none() {
            return Err(format!(
                "entity '{}' has update_cmd but no list_cmd to pick records from",
                e.id
            ));
        }
    }
    if let Some(t) = &cfg.default_domain_template {
        if !t.contains("{code}") {
            return Err(format!(
                "default_domain_template '{t}' must contain the {{code}} placeholder"
            ));
        }
    }
    Ok(())
}

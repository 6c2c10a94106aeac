use super::{check_unique_names, flatten_fields, EntityKind, FormSchema, SchemaError};
use std::path::Path;

const ORGANIZATION_FORM: &str = include_str!("../../assets/forms/organization.json");
const TENANT_FORM: &str = include_str!("../../assets/forms/tenant.json");
const ROLE_FORM: &str = include_str!("../../assets/forms/role.json");

pub fn bundled_source(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Organization => ORGANIZATION_FORM,
        EntityKind::Tenant => TENANT_FORM,
        EntityKind::Role => ROLE_FORM,
    }
}

/// Load the form schema for `kind`. An override file (from config) wins
/// over the bundled document. Field name collisions are load errors.
pub fn load_schema(kind: EntityKind, override_path: Option<&Path>) -> Result<FormSchema, SchemaError> {
    let (name, text) = match override_path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|source| SchemaError::Io {
                path: p.to_path_buf(),
                source,
            })?;
            (p.display().to_string(), text)
        }
        None => (kind.noun().to_string(), bundled_source(kind).to_string()),
    };
    let schema = parse_schema(&name, &text)?;
    if schema.data.is_empty() {
        return Err(SchemaError::Missing(name));
    }
    tracing::debug!(
        schema = %name,
        title = schema.title.as_deref().unwrap_or("-"),
        version = schema.version.as_deref().unwrap_or("-"),
        groups = schema.data.len(),
        "loaded form schema"
    );
    Ok(schema)
}

pub fn parse_schema(name: &str, text: &str) -> Result<FormSchema, SchemaError> {
    let schema: FormSchema = serde_json::from_str(text).map_err(|source| SchemaError::Parse {
        name: name.to_string(),
        source,
    })?;
    check_unique_names(&flatten_fields(&schema.data))?;
    Ok(schema)
}

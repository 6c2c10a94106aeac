use crate::schema::EntityKind;

/// Per-kind table of the differences between the flat form state and the
/// nested payload the API takes. Everything the reconciler and the initial
/// state builder do differently per entity is listed here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityProfile {
    /// `(state key, domain path)` pairs where the form name differs from
    /// where the value lives in the record and the payload.
    pub aliases: &'static [(&'static str, &'static str)],
    /// Array-of-object fields in records, flattened to text via this key.
    pub list_item_keys: &'static [(&'static str, &'static str)],
    /// Text fields submitted as comma-split arrays.
    pub list_fields: &'static [&'static str],
    /// Subset of `list_fields` whose items are numbers.
    pub numeric_list_fields: &'static [&'static str],
    pub numeric_fields: &'static [&'static str],
    /// Values used when the form leaves a scalar blank.
    pub defaults: &'static [(&'static str, &'static str)],
    /// Identity fields that never change after creation.
    pub edit_omits: &'static [&'static str],
    /// Update-only fields.
    pub create_omits: &'static [&'static str],
    /// Synthesize a domain from `code` when none was entered on create.
    pub default_domain: bool,
    pub id_key: &'static str,
    /// Edit payloads carry the record id, always as a string.
    pub include_id_on_edit: bool,
    /// Keys submitted together or not at all: one blank member drops the set.
    pub paired_fields: &'static [&'static [&'static str]],
    /// Key prefixes whose text values are trimmed before submission.
    pub trimmed_prefixes: &'static [&'static str],
}

pub const GENERIC: EntityProfile = EntityProfile {
    aliases: &[],
    list_item_keys: &[],
    list_fields: &["domains", "meta.tags", "related_orgs", "org_admin"],
    numeric_list_fields: &["related_orgs"],
    numeric_fields: &[],
    defaults: &[],
    edit_omits: &[],
    create_omits: &[],
    default_domain: false,
    id_key: "id",
    include_id_on_edit: false,
    paired_fields: &[],
    trimmed_prefixes: &[],
};

pub const ORGANIZATION: EntityProfile = EntityProfile {
    list_item_keys: &[("domains", "domain")],
    edit_omits: &["code", "tenant_code", "param", "domains"],
    create_omits: &["related_orgs", "org_admin", "meta"],
    ..GENERIC
};

pub const TENANT: EntityProfile = EntityProfile {
    aliases: &[
        ("theme.primaryColor", "theming.primaryColor"),
        ("theme.secondaryColor", "theming.secondaryColor"),
        ("domain", "domains"),
    ],
    list_item_keys: &[("domains", "domain")],
    list_fields: &["domain", "meta.tags"],
    numeric_list_fields: &[],
    edit_omits: &["code"],
    default_domain: true,
    id_key: "code",
    ..GENERIC
};

pub const ROLE: EntityProfile = EntityProfile {
    aliases: &[
        ("entityTypeId", "meta.entityTypes.0.entityTypeId"),
        ("entityType", "meta.entityTypes.0.entityType"),
    ],
    list_fields: &[],
    numeric_list_fields: &[],
    numeric_fields: &["user_type", "organization_id"],
    defaults: &[
        ("status", "ACTIVE"),
        ("visibility", "PUBLIC"),
        ("tenant_code", "default"),
        ("user_type", "0"),
    ],
    include_id_on_edit: true,
    paired_fields: &[&["entityTypeId", "entityType"]],
    trimmed_prefixes: &["translations."],
    ..GENERIC
};

pub fn profile(kind: EntityKind) -> &'static EntityProfile {
    match kind {
        EntityKind::Organization => &ORGANIZATION,
        EntityKind::Tenant => &TENANT,
        EntityKind::Role => &ROLE,
    }
}

impl EntityProfile {
    /// Domain path a state key is stored under.
    pub fn target_path<'a>(&self, key: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, p)| *p)
            .unwrap_or(key)
    }

    pub fn is_list(&self, key: &str) -> bool {
        self.list_fields.contains(&key)
    }

    pub fn is_numeric_list(&self, key: &str) -> bool {
        self.numeric_list_fields.contains(&key)
    }

    pub fn is_numeric(&self, key: &str) -> bool {
        self.numeric_fields.contains(&key)
    }

    pub fn default_for(&self, key: &str) -> Option<&'static str> {
        self.defaults.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// The paired set `key` belongs to, if any.
    pub fn pair_of(&self, key: &str) -> Option<&'static [&'static str]> {
        self.paired_fields.iter().copied().find(|set| set.contains(&key))
    }

    pub fn is_trimmed(&self, key: &str) -> bool {
        self.trimmed_prefixes.iter().any(|p| key.starts_with(p))
    }

    pub fn list_item_key(&self, path: &str) -> Option<&'static str> {
        self.list_item_keys
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, k)| *k)
    }
}

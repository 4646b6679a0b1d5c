// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

/// Configuration record describing one user-authored field group.
///
/// Field groups are the input to schema synthesis: a named set of typed
/// fields plus metadata about which host types the group attaches to.
/// Exactly one of `sub_fields` or `id` determines where the group's fields
/// come from: embedded sub-fields for ephemeral groups (for example one
/// layout branch of a flexible-content field), a persisted storage id for
/// everything else. The `key` is globally unique across all groups known to
/// one build.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldGroupConfig {
    /// Globally unique group key.
    pub key: String,

    /// Free-form group title, used to derive the GraphQL type name when no
    /// explicit `graphql_field_name` is set.
    pub title: String,

    /// Explicit GraphQL name override, takes precedence over `title`.
    pub graphql_field_name: Option<String>,

    /// Explicit list of host type names this group attaches to.
    ///
    /// `None` means "not configured" and falls through to the location rule
    /// matcher. `Some(vec![])` means "attach nowhere"; the two must not be
    /// conflated.
    pub graphql_type_names: Option<Vec<String>>,

    /// When set, the group asks for rule-derived host types even though
    /// explicit `graphql_type_names` are present.
    pub map_from_location_rules: bool,

    /// Whether the group appears in the GraphQL schema at all. Defaults to
    /// true.
    pub show_in_graphql: bool,

    /// Additional interface names the generated types implement.
    pub interfaces: Vec<String>,

    /// Embedded field list for groups that are not backed by storage.
    pub sub_fields: Option<Vec<FieldConfig>>,

    /// Inline raw (storage-tier) field list, overriding the provider lookup
    /// by `id`. Clone resolution always operates on raw fields.
    pub raw_fields: Option<Vec<FieldConfig>>,

    /// Persisted group id, present when the group's fields live in storage.
    pub id: Option<u64>,

    /// Whether this group describes an options page.
    pub is_options_page: bool,

    /// Options page slug, required when `is_options_page` is set. Doubles
    /// as the key the deferred loader fetches the page record under.
    pub menu_slug: Option<String>,
}

impl Default for FieldGroupConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            title: String::new(),
            graphql_field_name: None,
            graphql_type_names: None,
            map_from_location_rules: false,
            show_in_graphql: true,
            interfaces: Vec::new(),
            sub_fields: None,
            raw_fields: None,
            id: None,
            is_options_page: false,
            menu_slug: None,
        }
    }
}

/// Configuration record describing one field inside a field group.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Unique field key, also the key its value is stored under.
    pub key: String,

    /// Machine name of the field.
    pub name: String,

    /// Human-readable label.
    pub label: String,

    /// Tag selecting the field-kind mapper ("text", "link", ...). Unknown
    /// tags are skipped during compilation.
    pub kind: String,

    /// Explicit GraphQL name override, takes precedence over `name`.
    pub graphql_field_name: Option<String>,

    /// Author-facing instructions, used as the GraphQL field description.
    pub instructions: Option<String>,

    /// Keys this clone field transcludes its definition from. Non-empty
    /// only for clone fields; entries may name field groups (interface
    /// composition) or single fields (definition substitution).
    pub clone_source_keys: Vec<String>,

    /// Key of the layout this field belongs to, when nested inside one
    /// branch of a flexible-content parent.
    pub parent_layout_key: Option<String>,
}

/// Host environment capabilities gating optional synthesis features.
#[derive(Clone, Copy, Debug)]
pub struct Capabilities {
    /// Whether the extended cloning capability is available. When inactive
    /// clone fields are compiled verbatim and contribute no interfaces.
    pub clone_fields: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { clone_fields: true }
    }
}

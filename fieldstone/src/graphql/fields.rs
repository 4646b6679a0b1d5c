// SPDX-License-Identifier: AGPL-3.0-or-later

//! Compiles one field group's field list into schema field configs.
//!
//! Per-kind mapping is pluggable: a registration table maps kind tags to
//! mapper functions and unknown tags are skipped, never a crash. Clone
//! occurrences compile with the original field's shape while keeping their
//! own key, so the eventual resolver reads the occurrence's storage
//! location.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::TypeRef;
use async_graphql::indexmap::IndexMap;
use async_graphql::Value;
use log::debug;

use crate::config::{Capabilities, FieldConfig, FieldGroupConfig};
use crate::graphql::constants;
use crate::graphql::names;
use crate::provider::GroupProvider;

/// Reference to a GraphQL output type by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRefSpec {
    /// A nullable named type.
    Named(String),

    /// A non-null named type.
    NamedNonNull(String),

    /// A nullable list of nullable named items.
    List(String),
}

impl TypeRefSpec {
    /// Nullable `String`.
    pub fn string() -> Self {
        Self::Named(TypeRef::STRING.to_string())
    }

    /// Nullable `Float`.
    pub fn float() -> Self {
        Self::Named(TypeRef::FLOAT.to_string())
    }

    /// Nullable `Boolean`.
    pub fn boolean() -> Self {
        Self::Named(TypeRef::BOOLEAN.to_string())
    }

    /// Non-null `ID`.
    pub fn id_non_null() -> Self {
        Self::NamedNonNull(TypeRef::ID.to_string())
    }

    /// Lowers the reference for the schema builder.
    pub fn to_type_ref(&self) -> TypeRef {
        match self {
            Self::Named(name) => TypeRef::named(name.clone()),
            Self::NamedNonNull(name) => TypeRef::named_nn(name.clone()),
            Self::List(name) => TypeRef::named_list(name.clone()),
        }
    }
}

/// Meta fields of an options page record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaField {
    /// Stable identifier derived from the page's slug.
    Id,

    /// Title shown on the page itself.
    PageTitle,

    /// Title shown in the host's menu.
    MenuTitle,

    /// Identifier of the parent page.
    ParentId,
}

/// How a schema field obtains its value at execution time.
///
/// Kept as data rather than opaque closures so tests can observe which key
/// a resolver is bound to; the dynamic backend lowers each variant into an
/// actual resolver closure.
#[derive(Clone, Debug)]
pub enum FieldResolver {
    /// Always resolves to the given value.
    Constant(Value),

    /// Fetches the backing value from the field value store under `key`.
    StoredValue {
        /// Backing storage key, for clone occurrences the occurrence's
        /// own key.
        key: String,
    },

    /// Reads one entry of a raw stored map passed down by the parent field.
    MapEntry {
        /// Storage-tier key inside the map.
        key: String,
    },

    /// Passes a field group carrier from a host type down to the group's
    /// object type.
    AttachedGroup {
        /// The group the carrier resolves for.
        group: Arc<FieldGroupConfig>,
    },

    /// Loads an options page record through the deferred loader and passes
    /// the carrier down.
    OptionsPage {
        /// Slug the record is fetched under.
        menu_slug: String,
        /// The options page group the carrier resolves for.
        group: Arc<FieldGroupConfig>,
    },

    /// Reads a meta field of a loaded options page record.
    RecordMeta(MetaField),

    /// Resolves a host type stub from the root query.
    HostNode {
        /// Name of the host type, used as the fallback source id.
        type_name: String,
    },

    /// Resolves a host stub's identifier from its opaque source.
    SourceId,
}

/// Compiled configuration of one GraphQL field.
#[derive(Clone, Debug)]
pub struct SchemaFieldConfig {
    /// Output type of the field.
    pub type_ref: TypeRefSpec,

    /// Field description shown in the schema.
    pub description: Option<String>,

    /// Deprecation reason, when the field is deprecated.
    pub deprecation_reason: Option<String>,

    /// Declared arguments of the field.
    pub arguments: Vec<(String, TypeRefSpec)>,

    /// Value resolution strategy.
    pub resolver: FieldResolver,

    /// The original field config, carried for the resolver's later use.
    pub backing_field: Option<FieldConfig>,
}

impl SchemaFieldConfig {
    /// Returns a plain field config without description or arguments.
    pub fn new(type_ref: TypeRefSpec, resolver: FieldResolver) -> Self {
        Self {
            type_ref,
            description: None,
            deprecation_reason: None,
            arguments: Vec::new(),
            resolver,
            backing_field: None,
        }
    }

    /// Sets the field description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the field deprecated.
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    /// Declares an argument on the field.
    pub fn argument(mut self, name: impl Into<String>, type_ref: TypeRefSpec) -> Self {
        self.arguments.push((name.into(), type_ref));
        self
    }
}

/// Compiled fields of one group, by GraphQL field name.
pub type CompiledFields = IndexMap<String, SchemaFieldConfig>;

/// Maps one field config to a schema field config, or `None` to skip the
/// field.
pub type FieldKindMapper =
    Arc<dyn Fn(&FieldConfig, &FieldGroupConfig) -> Option<SchemaFieldConfig> + Send + Sync>;

/// Registration table dispatching field kinds to their mappers.
#[derive(Clone, Default)]
pub struct FieldKindRegistry {
    mappers: HashMap<String, FieldKindMapper>,
}

fn stored_field(field: &FieldConfig, type_ref: TypeRefSpec) -> SchemaFieldConfig {
    let description = field.instructions.clone().unwrap_or_else(|| {
        let label = if field.label.is_empty() {
            &field.name
        } else {
            &field.label
        };
        format!("The \"{}\" field", label)
    });

    SchemaFieldConfig {
        type_ref,
        description: Some(description),
        deprecation_reason: None,
        arguments: Vec::new(),
        resolver: FieldResolver::StoredValue {
            key: field.key.clone(),
        },
        backing_field: Some(field.clone()),
    }
}

fn stored_mapper(type_ref: TypeRefSpec) -> FieldKindMapper {
    Arc::new(move |field, _group| Some(stored_field(field, type_ref.clone())))
}

impl FieldKindRegistry {
    /// Returns an empty registry; every field kind is unsupported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a registry covering the standard field kinds.
    pub fn standard() -> Self {
        let mut registry = Self::new();

        for kind in [
            "text",
            "textarea",
            "email",
            "url",
            "password",
            "wysiwyg",
            "select",
            "radio",
            "button_group",
        ] {
            registry.register(kind, stored_mapper(TypeRefSpec::string()));
        }

        for kind in ["number", "range"] {
            registry.register(kind, stored_mapper(TypeRefSpec::float()));
        }

        registry.register("true_false", stored_mapper(TypeRefSpec::boolean()));

        registry.register(
            "link",
            stored_mapper(TypeRefSpec::Named(constants::LINK_OBJECT.to_string())),
        );
        registry.register(
            "google_map",
            stored_mapper(TypeRefSpec::Named(constants::GOOGLE_MAP_OBJECT.to_string())),
        );

        registry
    }

    /// Registers (or replaces) the mapper for a kind tag.
    pub fn register(&mut self, kind: impl Into<String>, mapper: FieldKindMapper) {
        self.mappers.insert(kind.into(), mapper);
    }

    /// Whether a mapper is registered for the kind tag.
    pub fn supports(&self, kind: &str) -> bool {
        self.mappers.contains_key(kind)
    }

    /// Maps a field through its kind's mapper. `None` means the kind is
    /// unsupported or intentionally hidden.
    pub fn map(
        &self,
        field: &FieldConfig,
        group: &FieldGroupConfig,
    ) -> Option<SchemaFieldConfig> {
        self.mappers.get(&field.kind)?(field, group)
    }
}

impl fmt::Debug for FieldKindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.mappers.keys().collect();
        kinds.sort();
        f.debug_struct("FieldKindRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

/// Follows a clone occurrence's source keys to the original field config.
fn resolve_clone_source(field: &FieldConfig, provider: &GroupProvider) -> Option<FieldConfig> {
    field
        .clone_source_keys
        .iter()
        .find_map(|key| provider.find_field(key))
}

/// Compiles one group's field list into a map of schema field configs.
///
/// The result always contains at least the synthetic `fieldGroupName`
/// field, so a group with zero authored fields still produces a non-empty
/// field set. On duplicate field names within one group the last write
/// wins.
pub fn compile_field_group(
    group: &FieldGroupConfig,
    type_name: &str,
    provider: &GroupProvider,
    kinds: &FieldKindRegistry,
    capabilities: Capabilities,
) -> CompiledFields {
    let mut compiled = CompiledFields::new();

    // This field guarantees the group never registers with an empty field
    // set, which is rejected at registration time. Deprecated in favor of
    // structural type discrimination.
    compiled.insert(
        constants::FIELD_GROUP_NAME_FIELD.to_string(),
        SchemaFieldConfig::new(
            TypeRefSpec::string(),
            FieldResolver::Constant(Value::String(type_name.to_string())),
        )
        .description("The name of the field group")
        .deprecated(constants::FIELD_GROUP_NAME_DEPRECATION),
    );

    let authored = match &group.sub_fields {
        Some(sub_fields) => sub_fields.clone(),
        None => provider.raw_fields(group),
    };

    for field in &authored {
        let field_name = names::graphql_field_name(field);
        if field_name.is_empty() {
            debug!(
                "Field \"{}\" of group \"{}\" has no usable graphql name and is skipped",
                field.key, group.key
            );
            continue;
        }

        let mut effective = field.clone();
        if capabilities.clone_fields && !field.clone_source_keys.is_empty() {
            match resolve_clone_source(field, provider) {
                Some(original) => {
                    // The occurrence borrows the original's shape but keeps
                    // its own key: two clones of the same repeater resolve
                    // two independent values from two storage locations.
                    effective = original;
                    effective.key = field.key.clone();
                }
                None => {
                    debug!(
                        "Clone field \"{}\" of group \"{}\" references no existing field and is skipped",
                        field.key, group.key
                    );
                    continue;
                }
            }
        }

        match kinds.map(&effective, group) {
            Some(config) => {
                compiled.insert(field_name, config);
            }
            None => {
                debug!(
                    "Field kind \"{}\" of field \"{}\" is unsupported and is skipped",
                    effective.kind, field.key
                );
            }
        }
    }

    compiled
}

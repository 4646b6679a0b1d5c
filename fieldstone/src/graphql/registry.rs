// SPDX-License-Identifier: AGPL-3.0-or-later

//! Orchestrates one schema build pass.
//!
//! For every visible field group the registry derives the type name,
//! host type locations, interface set and compiled fields, then performs
//! idempotent registration of the group's fields interface, object type
//! and, when the group attaches anywhere, its attachment interface. One
//! registry instance owns one `RegisteredTypeTable` and lives for exactly
//! one build; no state leaks between builds.

use std::fmt;
use std::sync::Arc;

use async_graphql::Value;
use async_graphql::indexmap::IndexMap;
use log::debug;
use once_cell::sync::OnceCell;

use crate::config::{Capabilities, FieldGroupConfig};
use crate::graphql::clones;
use crate::graphql::constants;
use crate::graphql::fields::{
    compile_field_group, CompiledFields, FieldKindRegistry, FieldResolver, MetaField,
    SchemaFieldConfig, TypeRefSpec,
};
use crate::graphql::locations::{locations_for_group, LocationRuleProvider, LocationRuleSet};
use crate::graphql::names;
use crate::graphql::type_system::{InterfaceTypeConfig, ObjectTypeConfig, TypeSystem};
use crate::provider::GroupProvider;

/// What a name in the `RegisteredTypeTable` was registered as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationKind {
    /// A plain interface type.
    InterfaceType,

    /// An object type.
    ObjectType,

    /// A generated `<TypeName>_Fields` interface.
    FieldsInterface,
}

/// Names registered during one build, each at most once.
///
/// Subsequent registration attempts for a known name are no-ops, not
/// errors: multiple groups may legitimately request the same composite
/// type name across build passes or re-entrant calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisteredTypeTable {
    entries: IndexMap<String, RegistrationKind>,
}

impl RegisteredTypeTable {
    /// Returns an empty table for one build.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a name has been registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// What a name was registered as, if anything.
    pub fn kind_of(&self, name: &str) -> Option<RegistrationKind> {
        self.entries.get(name).copied()
    }

    /// Records a name. Returns `false` when the name was already known and
    /// the insert was a no-op.
    pub fn insert(&mut self, name: impl Into<String>, kind: RegistrationKind) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, kind);
        true
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| name.as_str())
    }
}

/// Synthesizes the GraphQL types of all visible field groups.
pub struct SchemaRegistry<'a> {
    provider: &'a GroupProvider,
    kinds: &'a FieldKindRegistry,
    rules: &'a dyn LocationRuleProvider,
    capabilities: Capabilities,
    registered: RegisteredTypeTable,
    rule_cache: OnceCell<LocationRuleSet>,
}

impl<'a> SchemaRegistry<'a> {
    /// Returns a fresh registry for one build.
    pub fn new(
        provider: &'a GroupProvider,
        kinds: &'a FieldKindRegistry,
        rules: &'a dyn LocationRuleProvider,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            provider,
            kinds,
            rules,
            capabilities,
            registered: RegisteredTypeTable::new(),
            rule_cache: OnceCell::new(),
        }
    }

    /// The names registered so far in this build.
    pub fn registered(&self) -> &RegisteredTypeTable {
        &self.registered
    }

    /// Runs the full build pass: fixed foundational types, options pages,
    /// then every visible field group.
    pub fn register_all(&mut self, types: &mut dyn TypeSystem) {
        self.register_initial_types(types);
        self.register_options_pages(types);
        self.register_field_groups(types);
    }

    /// Registers the fixed types every build starts from: the two base
    /// interfaces and the shared value objects.
    pub fn register_initial_types(&mut self, types: &mut dyn TypeSystem) {
        if self.registered.insert(
            constants::FIELD_GROUP_INTERFACE,
            RegistrationKind::InterfaceType,
        ) {
            types.register_interface_type(InterfaceTypeConfig {
                name: constants::FIELD_GROUP_INTERFACE.to_string(),
                description: Some("A field group managed by the host".to_string()),
                interfaces: Vec::new(),
                fields: group_name_only_fields(),
                locations: Vec::new(),
            });
        }

        if self.registered.insert(
            constants::FIELD_GROUP_FIELDS_INTERFACE,
            RegistrationKind::InterfaceType,
        ) {
            types.register_interface_type(InterfaceTypeConfig {
                name: constants::FIELD_GROUP_FIELDS_INTERFACE.to_string(),
                description: Some("Fields associated with a field group".to_string()),
                interfaces: Vec::new(),
                fields: group_name_only_fields(),
                locations: Vec::new(),
            });
        }

        if self
            .registered
            .insert(constants::GOOGLE_MAP_OBJECT, RegistrationKind::ObjectType)
        {
            types.register_object_type(google_map_config());
        }

        if self
            .registered
            .insert(constants::LINK_OBJECT, RegistrationKind::ObjectType)
        {
            types.register_object_type(link_config());
        }
    }

    /// Registers every visible options page group through the parallel
    /// options path: the shared `OptionsPage` interface, the page's object
    /// type and a loader-backed attachment interface on the root query.
    pub fn register_options_pages(&mut self, types: &mut dyn TypeSystem) {
        let pages: Vec<_> = self
            .provider
            .visible()
            .into_iter()
            .filter(|group| group.is_options_page)
            .collect();

        if pages.is_empty() {
            return;
        }

        if self.registered.insert(
            constants::OPTIONS_PAGE_INTERFACE,
            RegistrationKind::InterfaceType,
        ) {
            types.register_interface_type(InterfaceTypeConfig {
                name: constants::OPTIONS_PAGE_INTERFACE.to_string(),
                description: Some("An options page registered by the host".to_string()),
                interfaces: Vec::new(),
                fields: options_meta_fields(),
                locations: Vec::new(),
            });
        }

        for group in pages {
            let Some(type_name) = names::type_name_for_group(&group) else {
                continue;
            };
            let Some(menu_slug) = group.menu_slug.clone() else {
                debug!(
                    "Options page group \"{}\" has no menu slug and is skipped",
                    group.key
                );
                continue;
            };

            let compiled = compile_field_group(
                &group,
                &type_name,
                self.provider,
                self.kinds,
                self.capabilities,
            );

            if self.registered.insert(&type_name, RegistrationKind::ObjectType) {
                let mut fields = options_meta_fields();
                fields.extend(compiled);

                types.register_object_type(ObjectTypeConfig {
                    name: type_name.clone(),
                    description: Some(format!("The \"{}\" options page", type_name)),
                    interfaces: vec![
                        constants::OPTIONS_PAGE_INTERFACE.to_string(),
                        names::fields_interface_name(&type_name),
                    ],
                    fields,
                    locations: Vec::new(),
                });
            }

            let interface_name = names::options_attachment_interface_name(&type_name);
            let field_name = names::format_field_name(&type_name, true);

            if self
                .registered
                .insert(&interface_name, RegistrationKind::InterfaceType)
            {
                let mut fields = CompiledFields::new();
                fields.insert(
                    field_name.clone(),
                    SchemaFieldConfig::new(
                        TypeRefSpec::Named(type_name.clone()),
                        FieldResolver::OptionsPage {
                            menu_slug,
                            group: group.clone(),
                        },
                    )
                    .description(format!(
                        "Access point for the \"{}\" options page",
                        type_name
                    )),
                );

                types.register_interface_type(InterfaceTypeConfig {
                    name: interface_name.clone(),
                    description: Some(format!(
                        "Provides access to the \"{}\" options page via the \"{}\" field",
                        type_name, field_name
                    )),
                    interfaces: Vec::new(),
                    fields,
                    locations: Vec::new(),
                });
            }

            types.attach_interfaces_to_types(
                &[interface_name],
                &[constants::ROOT_QUERY.to_string()],
            );
        }
    }

    /// Registers every visible field group.
    pub fn register_field_groups(&mut self, types: &mut dyn TypeSystem) {
        let all_groups = self.provider.visible();

        for group in &all_groups {
            self.register_group(group, &all_groups, types);
        }
    }

    /// Runs the per-group algorithm: derive, compile, register.
    fn register_group(
        &mut self,
        group: &Arc<FieldGroupConfig>,
        all_groups: &[Arc<FieldGroupConfig>],
        types: &mut dyn TypeSystem,
    ) {
        let Some(type_name) = names::type_name_for_group(group) else {
            return;
        };

        let locations = locations_for_group(group, all_groups, &self.rule_cache, self.rules);
        let fields = compile_field_group(
            group,
            &type_name,
            self.provider,
            self.kinds,
            self.capabilities,
        );
        let interfaces =
            clones::interfaces_for_group(group, &type_name, self.provider, self.capabilities);

        self.register_group_parts(group, &type_name, locations, interfaces, fields, types);
    }

    /// Registers the attachment interface, fields interface and object
    /// type of one group from its precomputed parts.
    ///
    /// The attachment interface must come first: its resolver closure
    /// captures the group config used when the carrier is resolved as the
    /// object type. The fields interface precedes the object type so other
    /// groups' clone compositions can reference it by name.
    fn register_group_parts(
        &mut self,
        group: &Arc<FieldGroupConfig>,
        type_name: &str,
        locations: Vec<String>,
        interfaces: Vec<String>,
        fields: CompiledFields,
        types: &mut dyn TypeSystem,
    ) {
        // A group cannot be registered without a name and fields.
        if fields.is_empty() || type_name.is_empty() {
            debug!(
                "Field group \"{}\" compiled to no registrable type and is skipped",
                group.key
            );
            return;
        }

        if !locations.is_empty() {
            let interface_name = names::attachment_interface_name(type_name);
            let field_name = names::format_field_name(type_name, true);

            if self
                .registered
                .insert(&interface_name, RegistrationKind::InterfaceType)
            {
                let mut attachment_fields = CompiledFields::new();
                attachment_fields.insert(
                    field_name.clone(),
                    SchemaFieldConfig::new(
                        TypeRefSpec::Named(type_name.to_string()),
                        FieldResolver::AttachedGroup {
                            group: group.clone(),
                        },
                    )
                    .description(format!("Fields of the \"{}\" field group", type_name)),
                );

                types.register_interface_type(InterfaceTypeConfig {
                    name: interface_name.clone(),
                    description: Some(format!(
                        "Provides access to fields of the \"{}\" field group via the \"{}\" field",
                        type_name, field_name
                    )),
                    interfaces: Vec::new(),
                    fields: attachment_fields,
                    locations: locations.clone(),
                });
            }

            types.attach_interfaces_to_types(&[interface_name], &locations);
        }

        let fields_interface = names::fields_interface_name(type_name);
        if self
            .registered
            .insert(&fields_interface, RegistrationKind::FieldsInterface)
        {
            let mut implemented = interfaces;
            implemented.push(constants::FIELD_GROUP_FIELDS_INTERFACE.to_string());

            // Never self-implement.
            implemented.retain(|name| !name.eq_ignore_ascii_case(&fields_interface));

            types.register_interface_type(InterfaceTypeConfig {
                name: fields_interface.clone(),
                description: Some(format!(
                    "Interface representing the fields of the \"{}\" field group",
                    type_name
                )),
                interfaces: implemented,
                fields: fields.clone(),
                locations: locations.clone(),
            });
        }

        if self.registered.insert(type_name, RegistrationKind::ObjectType) {
            types.register_object_type(ObjectTypeConfig {
                name: type_name.to_string(),
                description: Some(format!("The \"{}\" field group", type_name)),
                interfaces: vec![fields_interface],
                fields,
                locations,
            });
        }
    }
}

impl fmt::Debug for SchemaRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `rules` is a bare trait object, print the rest.
        f.debug_struct("SchemaRegistry")
            .field("capabilities", &self.capabilities)
            .field("registered", &self.registered)
            .finish()
    }
}

/// The single synthetic field of the two base interfaces.
fn group_name_only_fields() -> CompiledFields {
    let mut fields = CompiledFields::new();
    fields.insert(
        constants::FIELD_GROUP_NAME_FIELD.to_string(),
        SchemaFieldConfig::new(TypeRefSpec::string(), FieldResolver::Constant(Value::Null))
            .description("The name of the field group")
            .deprecated(constants::FIELD_GROUP_NAME_DEPRECATION),
    );
    fields
}

/// Meta fields shared by the `OptionsPage` interface and every options
/// page object type.
fn options_meta_fields() -> CompiledFields {
    let mut fields = CompiledFields::new();
    fields.insert(
        constants::ID_FIELD.to_string(),
        SchemaFieldConfig::new(
            TypeRefSpec::id_non_null(),
            FieldResolver::RecordMeta(MetaField::Id),
        ),
    );
    fields.insert(
        constants::PAGE_TITLE_FIELD.to_string(),
        SchemaFieldConfig::new(
            TypeRefSpec::string(),
            FieldResolver::RecordMeta(MetaField::PageTitle),
        ),
    );
    fields.insert(
        constants::MENU_TITLE_FIELD.to_string(),
        SchemaFieldConfig::new(
            TypeRefSpec::string(),
            FieldResolver::RecordMeta(MetaField::MenuTitle),
        ),
    );
    fields.insert(
        constants::PARENT_ID_FIELD.to_string(),
        SchemaFieldConfig::new(
            TypeRefSpec::string(),
            FieldResolver::RecordMeta(MetaField::ParentId),
        ),
    );
    fields
}

/// Map-entry field of a shared value object, reading the raw stored map
/// under the original storage key.
fn map_field(storage_key: &str, type_ref: TypeRefSpec, description: &str) -> SchemaFieldConfig {
    SchemaFieldConfig::new(
        type_ref,
        FieldResolver::MapEntry {
            key: storage_key.to_string(),
        },
    )
    .description(description)
}

fn google_map_config() -> ObjectTypeConfig {
    let mut fields = CompiledFields::new();
    fields.insert(
        "streetAddress".to_string(),
        map_field(
            "address",
            TypeRefSpec::string(),
            "The street address associated with the map",
        ),
    );
    fields.insert(
        "latitude".to_string(),
        map_field(
            "lat",
            TypeRefSpec::float(),
            "The latitude associated with the map",
        ),
    );
    fields.insert(
        "longitude".to_string(),
        map_field(
            "lng",
            TypeRefSpec::float(),
            "The longitude associated with the map",
        ),
    );
    fields.insert(
        "streetName".to_string(),
        map_field(
            "street_name",
            TypeRefSpec::string(),
            "The street name associated with the map",
        ),
    );
    fields.insert(
        "streetNumber".to_string(),
        map_field(
            "street_number",
            TypeRefSpec::string(),
            "The street number associated with the map",
        ),
    );
    fields.insert(
        "city".to_string(),
        map_field(
            "city",
            TypeRefSpec::string(),
            "The city associated with the map",
        ),
    );
    fields.insert(
        "state".to_string(),
        map_field(
            "state",
            TypeRefSpec::string(),
            "The state associated with the map",
        ),
    );
    fields.insert(
        "stateShort".to_string(),
        map_field(
            "state_short",
            TypeRefSpec::string(),
            "The state abbreviation associated with the map",
        ),
    );
    fields.insert(
        "postCode".to_string(),
        map_field(
            "post_code",
            TypeRefSpec::string(),
            "The post code associated with the map",
        ),
    );
    fields.insert(
        "country".to_string(),
        map_field(
            "country",
            TypeRefSpec::string(),
            "The country associated with the map",
        ),
    );
    fields.insert(
        "countryShort".to_string(),
        map_field(
            "country_short",
            TypeRefSpec::string(),
            "The country abbreviation associated with the map",
        ),
    );
    fields.insert(
        "placeId".to_string(),
        map_field(
            "place_id",
            TypeRefSpec::string(),
            "The place id associated with the map",
        ),
    );
    fields.insert(
        "zoom".to_string(),
        map_field(
            "zoom",
            TypeRefSpec::string(),
            "The zoom level defined with the map",
        ),
    );

    ObjectTypeConfig {
        name: constants::GOOGLE_MAP_OBJECT.to_string(),
        description: Some("A group of fields representing a map location".to_string()),
        interfaces: Vec::new(),
        fields,
        locations: Vec::new(),
    }
}

fn link_config() -> ObjectTypeConfig {
    let mut fields = CompiledFields::new();
    fields.insert(
        "url".to_string(),
        map_field("url", TypeRefSpec::string(), "The url of the link"),
    );
    fields.insert(
        "title".to_string(),
        map_field("title", TypeRefSpec::string(), "The title of the link"),
    );
    fields.insert(
        "target".to_string(),
        map_field(
            "target",
            TypeRefSpec::string(),
            "The target of the link (_blank, etc)",
        ),
    );

    ObjectTypeConfig {
        name: constants::LINK_OBJECT.to_string(),
        description: Some("A link field value".to_string()),
        interfaces: Vec::new(),
        fields,
        locations: Vec::new(),
    }
}

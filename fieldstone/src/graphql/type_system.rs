// SPDX-License-Identifier: AGPL-3.0-or-later

//! The type-system mutation surface schema synthesis drives.
//!
//! The registry talks to a `TypeSystem` in terms of plain type and
//! interface configs with string-named references, so registration order
//! never matters and the whole surface is observable in tests. The
//! `DynamicTypeSystem` lowers the accumulated configs into
//! `async-graphql` dynamic types in one pass at the end of a build.

use std::collections::HashSet;

use async_graphql::dynamic::{
    Field, FieldFuture, Interface, InterfaceField, Object, SchemaBuilder,
};
use async_graphql::indexmap::IndexMap;
use async_graphql::Value;
use log::debug;

use crate::graphql::constants;
use crate::graphql::fields::{CompiledFields, FieldResolver, SchemaFieldConfig, TypeRefSpec};
use crate::graphql::names;
use crate::graphql::resolvers;

/// Configuration of one GraphQL interface type to register.
#[derive(Clone, Debug)]
pub struct InterfaceTypeConfig {
    /// Name of the interface.
    pub name: String,

    /// Description shown in the schema.
    pub description: Option<String>,

    /// Names of interfaces this interface implements.
    pub interfaces: Vec<String>,

    /// Fields of the interface.
    pub fields: CompiledFields,

    /// Host types the owning group attaches to, kept for introspection and
    /// debugging use.
    pub locations: Vec<String>,
}

/// Configuration of one GraphQL object type to register.
#[derive(Clone, Debug)]
pub struct ObjectTypeConfig {
    /// Name of the object type.
    pub name: String,

    /// Description shown in the schema.
    pub description: Option<String>,

    /// Names of interfaces this object implements.
    pub interfaces: Vec<String>,

    /// Fields of the object.
    pub fields: CompiledFields,

    /// Host types the owning group attaches to, kept for introspection and
    /// debugging use.
    pub locations: Vec<String>,
}

/// The type-system mutation surface driven by the schema registry.
///
/// Implementable as calls into any GraphQL schema-builder library; the
/// in-crate implementation targets the `async-graphql` dynamic module.
pub trait TypeSystem {
    /// Registers an interface type. Registering a name twice keeps the
    /// first configuration.
    fn register_interface_type(&mut self, config: InterfaceTypeConfig);

    /// Registers an object type. Registering a name twice keeps the first
    /// configuration.
    fn register_object_type(&mut self, config: ObjectTypeConfig);

    /// Grafts interfaces onto host types by name. Grafting the same
    /// interface onto the same host type twice is a no-op.
    fn attach_interfaces_to_types(&mut self, interface_names: &[String], host_type_names: &[String]);
}

/// Accumulates type configs and lowers them into an `async-graphql`
/// dynamic schema builder.
#[derive(Debug, Default)]
pub struct DynamicTypeSystem {
    interfaces: IndexMap<String, InterfaceTypeConfig>,
    objects: IndexMap<String, ObjectTypeConfig>,
    attachments: IndexMap<String, Vec<String>>,
}

impl TypeSystem for DynamicTypeSystem {
    fn register_interface_type(&mut self, config: InterfaceTypeConfig) {
        self.interfaces.entry(config.name.clone()).or_insert(config);
    }

    fn register_object_type(&mut self, config: ObjectTypeConfig) {
        self.objects.entry(config.name.clone()).or_insert(config);
    }

    fn attach_interfaces_to_types(
        &mut self,
        interface_names: &[String],
        host_type_names: &[String],
    ) {
        for host in host_type_names {
            let attached = self.attachments.entry(host.clone()).or_default();
            for interface in interface_names {
                if !attached.contains(interface) {
                    attached.push(interface.clone());
                }
            }
        }
    }
}

/// Lowers one compiled field into a dynamic object field.
fn lower_field(name: &str, config: &SchemaFieldConfig) -> Field {
    let resolver = config.resolver.clone();
    let mut field = Field::new(name, config.type_ref.to_type_ref(), move |ctx| {
        let resolver = resolver.clone();
        FieldFuture::new(async move { resolvers::resolve(resolver, ctx).await })
    });

    for (argument, type_ref) in &config.arguments {
        field = field.argument(async_graphql::dynamic::InputValue::new(
            argument,
            type_ref.to_type_ref(),
        ));
    }
    if let Some(description) = &config.description {
        field = field.description(description);
    }
    if let Some(reason) = &config.deprecation_reason {
        field = field.deprecation(Some(reason.as_str()));
    }

    field
}

/// Lowers one compiled field into a dynamic interface field. Interface
/// fields carry no resolvers; those stay with the implementing objects.
fn lower_interface_field(name: &str, config: &SchemaFieldConfig) -> InterfaceField {
    let mut field = InterfaceField::new(name, config.type_ref.to_type_ref());

    if let Some(description) = &config.description {
        field = field.description(description);
    }
    if let Some(reason) = &config.deprecation_reason {
        field = field.deprecation(Some(reason.as_str()));
    }

    field
}

/// Expands an interface list to its transitive closure, preserving
/// first-seen order. Names without a registered config are kept untouched;
/// the host may register them itself.
fn interface_closure(
    direct: &[String],
    interfaces: &IndexMap<String, InterfaceTypeConfig>,
) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    let mut queue: Vec<String> = direct.to_vec();
    let mut index = 0;

    while index < queue.len() {
        let name = queue[index].clone();
        index += 1;

        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(config) = interfaces.get(&name) {
            queue.extend(config.interfaces.iter().cloned());
        }
        result.push(name);
    }

    result
}

/// Returns the root query config the built schema starts from.
fn root_query_config() -> ObjectTypeConfig {
    let mut fields = CompiledFields::new();
    fields.insert(
        constants::PING_FIELD.to_string(),
        SchemaFieldConfig::new(
            TypeRefSpec::string(),
            FieldResolver::Constant(Value::String("pong".to_string())),
        )
        .description("Responds with \"pong\" as long as the schema is servable"),
    );

    ObjectTypeConfig {
        name: constants::ROOT_QUERY.to_string(),
        description: Some("The root query type".to_string()),
        interfaces: Vec::new(),
        fields,
        locations: Vec::new(),
    }
}

/// Returns a minimal stand-in object for an external host type.
///
/// The host object graph itself is out of scope, but a dynamic schema must
/// close over every referenced type name: each attachment target gets a
/// stub carrying an id and the grafted interfaces.
fn host_stub_config(name: &str) -> ObjectTypeConfig {
    let mut fields = CompiledFields::new();
    fields.insert(
        constants::ID_FIELD.to_string(),
        SchemaFieldConfig::new(TypeRefSpec::string(), FieldResolver::SourceId)
            .description("Opaque identifier of the host object"),
    );

    ObjectTypeConfig {
        name: name.to_string(),
        description: Some(format!("Stand-in for the host type \"{}\"", name)),
        interfaces: Vec::new(),
        fields,
        locations: Vec::new(),
    }
}

impl DynamicTypeSystem {
    /// Returns an empty type system for one build.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered interface configs, by name.
    pub fn interfaces(&self) -> &IndexMap<String, InterfaceTypeConfig> {
        &self.interfaces
    }

    /// Registered object configs, by name.
    pub fn objects(&self) -> &IndexMap<String, ObjectTypeConfig> {
        &self.objects
    }

    /// Grafted interface names per host type.
    pub fn attachments(&self) -> &IndexMap<String, Vec<String>> {
        &self.attachments
    }

    /// Lowers everything registered so far into the schema builder.
    ///
    /// Synthesizes the root query object and a stub per external host
    /// type, grafts attached interfaces (declaration plus fields) onto
    /// their hosts and expands interface lists to their transitive closure
    /// since GraphQL requires implementors to re-declare inherited interfaces.
    pub fn apply_into_schema_builder(self, mut builder: SchemaBuilder) -> SchemaBuilder {
        let Self {
            interfaces,
            mut objects,
            attachments,
        } = self;

        // The root query object always exists so options page attachments
        // and host queries have somewhere to live.
        if !objects.contains_key(constants::ROOT_QUERY) {
            objects.insert(constants::ROOT_QUERY.to_string(), root_query_config());
        }

        // Synthesize stubs for attachment targets the build doesn't own,
        // each queryable from the root for self-contained execution.
        let mut host_queries = Vec::new();
        for host in attachments.keys() {
            if objects.contains_key(host) {
                continue;
            }
            if interfaces.contains_key(host) {
                debug!(
                    "Cannot attach interfaces to \"{}\" because it is an interface",
                    host
                );
                continue;
            }
            objects.insert(host.clone(), host_stub_config(host));
            host_queries.push(host.clone());
        }

        for host in host_queries {
            let query = objects
                .get_mut(constants::ROOT_QUERY)
                .expect("Root query config registered above");
            query.fields.insert(
                names::format_field_name(&host, true),
                SchemaFieldConfig::new(
                    TypeRefSpec::Named(host.clone()),
                    FieldResolver::HostNode {
                        type_name: host.clone(),
                    },
                )
                .argument(constants::ID_ARG, TypeRefSpec::string())
                .description(format!("Query the \"{}\" host type by source id", host)),
            );
        }

        // Graft attached interfaces onto their host objects: the interface
        // declaration plus every interface field the host doesn't define
        // itself, resolvers included.
        for (host, attached) in &attachments {
            let Some(object) = objects.get_mut(host) else {
                continue;
            };

            for interface_name in attached {
                if !object.interfaces.contains(interface_name) {
                    object.interfaces.push(interface_name.clone());
                }

                let Some(interface) = interfaces.get(interface_name) else {
                    debug!(
                        "Interface \"{}\" attached to \"{}\" is not registered",
                        interface_name, host
                    );
                    continue;
                };
                for (field_name, field_config) in &interface.fields {
                    if !object.fields.contains_key(field_name) {
                        object
                            .fields
                            .insert(field_name.clone(), field_config.clone());
                    }
                }
            }
        }

        for config in interfaces.values() {
            let mut interface = Interface::new(config.name.clone());
            if let Some(description) = &config.description {
                interface = interface.description(description);
            }
            for implemented in interface_closure(&config.interfaces, &interfaces) {
                interface = interface.implement(implemented);
            }
            for (name, field_config) in &config.fields {
                interface = interface.field(lower_interface_field(name, field_config));
            }
            builder = builder.register(interface);
        }

        for config in objects.values() {
            let mut object = Object::new(config.name.clone());
            if let Some(description) = &config.description {
                object = object.description(description);
            }
            for implemented in interface_closure(&config.interfaces, &interfaces) {
                object = object.implement(implemented);
            }
            for (name, field_config) in &config.fields {
                object = object.field(lower_field(name, field_config));
            }
            builder = builder.register(object);
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use async_graphql::indexmap::IndexMap;

    use crate::graphql::fields::{
        CompiledFields, FieldResolver, SchemaFieldConfig, TypeRefSpec,
    };

    use super::{
        interface_closure, DynamicTypeSystem, InterfaceTypeConfig, ObjectTypeConfig, TypeSystem,
    };

    fn string_field(name: &str) -> (String, SchemaFieldConfig) {
        (
            name.to_string(),
            SchemaFieldConfig::new(
                TypeRefSpec::string(),
                FieldResolver::StoredValue {
                    key: format!("field_{}", name),
                },
            ),
        )
    }

    fn interface(name: &str, interfaces: &[&str], fields: &[&str]) -> InterfaceTypeConfig {
        InterfaceTypeConfig {
            name: name.to_string(),
            description: None,
            interfaces: interfaces.iter().map(|i| i.to_string()).collect(),
            fields: fields.iter().map(|f| string_field(f)).collect(),
            locations: Vec::new(),
        }
    }

    #[test]
    fn first_registration_wins() {
        let mut types = DynamicTypeSystem::new();
        types.register_interface_type(interface("Hero_Fields", &[], &["headline"]));
        types.register_interface_type(interface("Hero_Fields", &[], &["replaced"]));

        assert!(types.interfaces()["Hero_Fields"].fields.contains_key("headline"));
    }

    #[test]
    fn attaching_twice_is_a_no_op() {
        let mut types = DynamicTypeSystem::new();
        let interfaces = vec!["WithAcfHero".to_string()];
        let hosts = vec!["Page".to_string()];

        types.attach_interfaces_to_types(&interfaces, &hosts);
        types.attach_interfaces_to_types(&interfaces, &hosts);

        assert_eq!(types.attachments()["Page"], vec!["WithAcfHero".to_string()]);
    }

    #[test]
    fn closure_expands_transitive_interfaces() {
        let mut interfaces = IndexMap::new();
        interfaces.insert(
            "Hero_Fields".to_string(),
            interface("Hero_Fields", &["FieldGroup", "FieldGroupFields"], &[]),
        );
        interfaces.insert("FieldGroup".to_string(), interface("FieldGroup", &[], &[]));
        interfaces.insert(
            "FieldGroupFields".to_string(),
            interface("FieldGroupFields", &[], &[]),
        );

        let closure = interface_closure(&["Hero_Fields".to_string()], &interfaces);
        assert_eq!(
            closure,
            vec![
                "Hero_Fields".to_string(),
                "FieldGroup".to_string(),
                "FieldGroupFields".to_string(),
            ]
        );
    }

    #[test]
    fn closure_keeps_unknown_interfaces() {
        let interfaces = IndexMap::new();
        let closure = interface_closure(&["HostDefined".to_string()], &interfaces);
        assert_eq!(closure, vec!["HostDefined".to_string()]);
    }

    #[test]
    fn grafts_interface_fields_onto_host_stubs() {
        let mut types = DynamicTypeSystem::new();
        types.register_interface_type(interface("WithAcfHero", &[], &["hero"]));
        types.attach_interfaces_to_types(
            &["WithAcfHero".to_string()],
            &["Page".to_string()],
        );

        // Lowering succeeds and produces a schema containing the stub.
        let builder = async_graphql::dynamic::Schema::build("Query", None, None);
        let schema = types.apply_into_schema_builder(builder).finish();
        assert!(schema.is_ok());
    }

    #[test]
    fn grafting_onto_owned_objects_lowers_cleanly() {
        let mut types = DynamicTypeSystem::new();
        types.register_interface_type(interface("WithAcfHero", &[], &["hero"]));
        types.register_object_type(ObjectTypeConfig {
            name: "Page".to_string(),
            description: None,
            interfaces: Vec::new(),
            fields: [string_field("hero")].into_iter().collect::<CompiledFields>(),
            locations: Vec::new(),
        });
        types.attach_interfaces_to_types(
            &["WithAcfHero".to_string()],
            &["Page".to_string()],
        );

        let builder = async_graphql::dynamic::Schema::build("Query", None, None);
        let schema = types.apply_into_schema_builder(builder).finish();
        assert!(schema.is_ok());
    }
}

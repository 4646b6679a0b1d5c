// SPDX-License-Identifier: AGPL-3.0-or-later

//! Schema synthesis: name derivation, location and clone resolution, field
//! compilation and idempotent type registration, lowered into an
//! `async-graphql` dynamic schema.

pub mod clones;
pub mod constants;
pub mod fields;
pub mod locations;
pub mod names;
mod registry;
mod resolvers;
mod schema;
mod type_system;

pub use registry::{RegisteredTypeTable, RegistrationKind, SchemaRegistry};
pub use resolvers::GroupValue;
pub use schema::{build_root_schema, SchemaManager, SharedBuildData};
pub use type_system::{DynamicTypeSystem, InterfaceTypeConfig, ObjectTypeConfig, TypeSystem};

// SPDX-License-Identifier: AGPL-3.0-or-later

//! # fieldstone
//!
//! Synthesizes a typed GraphQL schema from user-authored field group
//! configuration records: name derivation, clone-interface composition,
//! location-to-type resolution and idempotent type registration, executed
//! against pluggable host stores.
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

mod config;
mod errors;
pub mod graphql;
mod loader;
mod provider;
mod store;

#[cfg(test)]
mod test_utils;

pub use crate::config::{Capabilities, FieldConfig, FieldGroupConfig};
pub use crate::errors::{LoaderError, SchemaBuildError, StoreError};
pub use crate::graphql::fields::{
    CompiledFields, FieldKindMapper, FieldKindRegistry, FieldResolver, MetaField,
    SchemaFieldConfig, TypeRefSpec,
};
pub use crate::graphql::locations::{LocationRuleProvider, LocationRuleSet};
pub use crate::graphql::{
    build_root_schema, DynamicTypeSystem, GroupValue, InterfaceTypeConfig, ObjectTypeConfig,
    RegisteredTypeTable, RegistrationKind, SchemaManager, SchemaRegistry, SharedBuildData,
    TypeSystem,
};
pub use crate::loader::{DeferredHandle, DeferredLoader, LoaderState};
pub use crate::provider::GroupProvider;
pub use crate::store::{FieldValueStore, OptionsPageRecord, RecordStore, Source};

// SPDX-License-Identifier: AGPL-3.0-or-later

//! Build and manage the root GraphQL schema synthesized from field groups.

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response};
use log::{info, warn};
use tokio::sync::Mutex;

use crate::config::Capabilities;
use crate::errors::SchemaBuildError;
use crate::graphql::constants;
use crate::graphql::fields::FieldKindRegistry;
use crate::graphql::locations::LocationRuleProvider;
use crate::graphql::registry::SchemaRegistry;
use crate::graphql::type_system::DynamicTypeSystem;
use crate::loader::DeferredLoader;
use crate::provider::GroupProvider;
use crate::store::{FieldValueStore, RecordStore};

/// Collaborators shared by every schema build.
#[derive(Clone)]
pub struct SharedBuildData {
    /// Field group configurations known to the host.
    pub groups: GroupProvider,

    /// Field-kind mapper table.
    pub kinds: Arc<FieldKindRegistry>,

    /// Host rule matcher deriving locations from raw predicates.
    pub rules: Arc<dyn LocationRuleProvider>,

    /// Key/value lookup for persisted field values.
    pub value_store: Arc<dyn FieldValueStore>,

    /// Batched fetch backing the deferred options page loader.
    pub record_store: Arc<dyn RecordStore>,

    /// Host environment capabilities.
    pub capabilities: Capabilities,
}

impl fmt::Debug for SharedBuildData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The stores and rule matcher are bare trait objects, print the
        // rest.
        f.debug_struct("SharedBuildData")
            .field("groups", &self.groups)
            .field("kinds", &self.kinds)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Builds the root GraphQL schema from the current set of field groups.
///
/// Synthesis is synchronous and deterministic: one pass over the visible
/// groups, one fresh registry, no I/O beyond the already-loaded
/// configuration set.
pub fn build_root_schema(shared: &SharedBuildData) -> Result<Schema, SchemaBuildError> {
    let mut registry = SchemaRegistry::new(
        &shared.groups,
        &shared.kinds,
        shared.rules.as_ref(),
        shared.capabilities,
    );
    let mut types = DynamicTypeSystem::new();

    registry.register_all(&mut types);

    let builder = types
        .apply_into_schema_builder(Schema::build(constants::ROOT_QUERY, None, None))
        .data(shared.value_store.clone())
        .data(shared.record_store.clone());

    Ok(builder.finish()?)
}

/// List of built root schemas.
type Schemas = Arc<Mutex<Vec<Schema>>>;

/// Builds new GraphQL schemas dynamically and executes the latest schema
/// for incoming queries.
///
/// The manager subscribes to the group provider and rebuilds in the
/// background whenever a field group changes, so current queries still get
/// processed using the previous schema while the new one is built.
#[derive(Clone)]
pub struct SchemaManager {
    /// All built root schemas, latest last.
    schemas: Schemas,

    /// Commonly shared collaborators for schema builds.
    shared: SharedBuildData,
}

impl SchemaManager {
    /// Builds the initial schema and spawns the rebuild task.
    pub async fn new(shared: SharedBuildData) -> Result<Self, SchemaBuildError> {
        let schemas = Arc::new(Mutex::new(vec![build_root_schema(&shared)?]));

        let manager = Self { schemas, shared };
        manager.spawn_rebuild_task();

        Ok(manager)
    }

    /// Subscribes to the group provider for changed field groups.
    fn spawn_rebuild_task(&self) {
        let shared = self.shared.clone();
        let schemas = self.schemas.clone();

        info!("Subscribing schema manager to group provider");
        let mut on_group_added = shared.groups.on_group_added();

        tokio::task::spawn(async move {
            while let Ok(key) = on_group_added.recv().await {
                info!("Changed field group \"{}\", rebuilding GraphQL schema", key);
                match build_root_schema(&shared) {
                    Ok(schema) => schemas.lock().await.push(schema),
                    Err(err) => warn!("Failed rebuilding GraphQL schema: {}", err),
                }
            }
        });
    }

    /// Executes an incoming GraphQL query against the latest schema.
    ///
    /// Every request gets its own deferred loader: buffered record fetches
    /// are batched within one request and never shared with the next.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        let request = request.into().data(DeferredLoader::new());

        self.schemas
            .lock()
            .await
            .last()
            .expect("At least one schema is built on construction")
            .execute(request)
            .await
    }
}

impl fmt::Debug for SchemaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `schemas` does not implement `Debug` but we can at least print
        // the shared collaborators.
        f.debug_struct("SchemaManager")
            .field("shared", &self.shared)
            .finish()
    }
}

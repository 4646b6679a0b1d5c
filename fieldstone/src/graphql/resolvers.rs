// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{Error, Value};

use crate::config::FieldGroupConfig;
use crate::graphql::constants;
use crate::graphql::fields::{FieldResolver, MetaField};
use crate::loader::DeferredLoader;
use crate::store::{FieldValueStore, OptionsPageRecord, RecordStore, Source};

/// Field group data passed between resolvers.
///
/// The attachment interface resolver only pairs the host's source with the
/// group config; binding of the actual field values happens one level down,
/// when the carrier is resolved as the group's object type.
#[derive(Clone, Debug)]
pub struct GroupValue {
    /// Opaque host source field values are stored against.
    pub source: Source,

    /// The group this carrier resolves for.
    pub group: Arc<FieldGroupConfig>,

    /// Loaded record backing the carrier, on the options page path.
    pub record: Option<OptionsPageRecord>,
}

impl GroupValue {
    /// Downcast the carrier which will have been passed up by the parent
    /// field, retrieved via the `ResolverContext`.
    ///
    /// We unwrap internally here as the parent resolvers are generated
    /// alongside these fields and always pass a carrier.
    pub fn downcast(ctx: &ResolverContext) -> Self {
        ctx.parent_value
            .downcast_ref::<Self>()
            .expect("Values passed from query parent should match expected")
            .to_owned()
    }
}

/// Downcast the opaque host source passed up by a host type resolver.
fn downcast_source(ctx: &ResolverContext) -> Source {
    ctx.parent_value
        .downcast_ref::<Source>()
        .expect("Values passed from query parent should match expected")
        .to_owned()
}

/// Resolves one field according to its compiled resolution strategy.
pub async fn resolve(
    resolver: FieldResolver,
    ctx: ResolverContext<'_>,
) -> Result<Option<FieldValue<'_>>, Error> {
    match resolver {
        FieldResolver::Constant(value) => Ok(Some(FieldValue::value(value))),
        FieldResolver::StoredValue { key } => resolve_stored_value(ctx, &key).await,
        FieldResolver::MapEntry { key } => resolve_map_entry(ctx, &key),
        FieldResolver::AttachedGroup { group } => resolve_attached_group(ctx, group),
        FieldResolver::OptionsPage { menu_slug, group } => {
            resolve_options_page(ctx, &menu_slug, group).await
        }
        FieldResolver::RecordMeta(meta) => resolve_record_meta(ctx, meta),
        FieldResolver::HostNode { type_name } => resolve_host_node(ctx, &type_name),
        FieldResolver::SourceId => resolve_source_id(ctx),
    }
}

/// Fetches a field's backing value from the field value store.
async fn resolve_stored_value<'a>(
    ctx: ResolverContext<'a>,
    key: &str,
) -> Result<Option<FieldValue<'a>>, Error> {
    let carrier = GroupValue::downcast(&ctx);
    let store = ctx.data_unchecked::<Arc<dyn FieldValueStore>>();

    let value = store.get(key, &carrier.source).await?;
    Ok(value.map(FieldValue::value))
}

/// Reads one entry of a raw stored map passed up by the parent field.
///
/// Map-shaped field values (links, maps) resolve their sub-fields from the
/// storage-tier keys of the raw value.
fn resolve_map_entry<'a>(
    ctx: ResolverContext<'a>,
    key: &str,
) -> Result<Option<FieldValue<'a>>, Error> {
    match ctx.parent_value.as_value() {
        Some(Value::Object(map)) => {
            let value = map.get(key).map(|value| FieldValue::value(value.clone()));
            Ok(value)
        }
        _ => Ok(FieldValue::NONE),
    }
}

/// Pairs the host node's source with the group config and passes the
/// carrier down to the group's object type.
fn resolve_attached_group<'a>(
    ctx: ResolverContext<'a>,
    group: Arc<FieldGroupConfig>,
) -> Result<Option<FieldValue<'a>>, Error> {
    let source = downcast_source(&ctx);
    Ok(Some(FieldValue::owned_any(GroupValue {
        source,
        group,
        record: None,
    })))
}

/// Loads an options page record through the request's deferred loader.
///
/// Sibling options page fields buffered before this point are fetched in
/// the same batch; a missing record resolves the field to null.
async fn resolve_options_page<'a>(
    ctx: ResolverContext<'a>,
    menu_slug: &str,
    group: Arc<FieldGroupConfig>,
) -> Result<Option<FieldValue<'a>>, Error> {
    // The loader is request-scoped data attached by the schema manager; a
    // missing loader is a per-field resolution error, not a panic.
    let loader = ctx.data::<DeferredLoader>()?;
    let store = ctx.data_unchecked::<Arc<dyn RecordStore>>();

    match loader.load(menu_slug, store.as_ref()).await? {
        Some(record) => Ok(Some(FieldValue::owned_any(GroupValue {
            source: Source::new(menu_slug),
            group,
            record: Some(record),
        }))),
        None => Ok(FieldValue::NONE),
    }
}

/// Resolves a meta field of a loaded options page record.
fn resolve_record_meta<'a>(
    ctx: ResolverContext<'a>,
    meta: MetaField,
) -> Result<Option<FieldValue<'a>>, Error> {
    let carrier = GroupValue::downcast(&ctx);
    let record = carrier.record;

    let value = match meta {
        MetaField::Id => Some(Value::String(format!(
            "options_page:{}",
            carrier.source.as_str()
        ))),
        MetaField::PageTitle => record.and_then(|record| record.page_title).map(Value::String),
        MetaField::MenuTitle => record.and_then(|record| record.menu_title).map(Value::String),
        MetaField::ParentId => record.and_then(|record| record.parent_id).map(Value::String),
    };

    Ok(value.map(FieldValue::value))
}

/// Resolves a host type stub from the root query, passing the opaque
/// source id down to the attached field groups.
fn resolve_host_node<'a>(
    ctx: ResolverContext<'a>,
    type_name: &str,
) -> Result<Option<FieldValue<'a>>, Error> {
    let source = match ctx.args.get(constants::ID_ARG) {
        Some(id) => Source::new(id.string()?),
        None => Source::new(type_name),
    };

    Ok(Some(FieldValue::owned_any(source)))
}

/// Resolves a host stub's identifier from its opaque source.
fn resolve_source_id<'a>(ctx: ResolverContext<'a>) -> Result<Option<FieldValue<'a>>, Error> {
    let source = downcast_source(&ctx);
    Ok(Some(FieldValue::value(Value::String(
        source.as_str().to_string(),
    ))))
}

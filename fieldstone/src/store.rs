// SPDX-License-Identifier: AGPL-3.0-or-later

//! Contracts for the external stores field resolvers read from.
//!
//! The engine never owns persistence: field values live in a host-provided
//! key/value record store and options page records are fetched in batches.
//! Both are consumed through the traits below, registered as schema data so
//! resolver closures can reach them at execution time.

use std::collections::HashMap;
use std::fmt;

use async_graphql::Value;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Opaque identifier of a host object a field value is stored against.
///
/// The host graph passes these through resolvers untouched; for options
/// pages the page's menu slug takes this role.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source(String);

impl Source {
    /// Wraps a host-provided source identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Singleton record backing one options page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsPageRecord {
    /// Slug the record is registered under.
    pub menu_slug: String,

    /// Title shown on the page itself.
    pub page_title: Option<String>,

    /// Title shown in the host's menu.
    pub menu_title: Option<String>,

    /// Identifier of the parent page, when nested.
    pub parent_id: Option<String>,
}

/// Key/value lookup for persisted field values.
///
/// `get` receives the backing field key (for clone occurrences this is the
/// occurrence's own key, never the original's) and the source the value is
/// stored against.
#[async_trait]
pub trait FieldValueStore: Send + Sync {
    /// Fetches the stored value for a field key on the given source, or
    /// `None` when nothing was saved.
    async fn get(&self, key: &str, source: &Source) -> Result<Option<Value>, StoreError>;
}

/// Batched fetch of options page records, driven by the deferred loader.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches all requested records in one round-trip. Keys without a
    /// record map to `None`; missing map entries are treated the same way.
    async fn fetch_record_batch(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Option<OptionsPageRecord>>, StoreError>;
}

// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fixtures shared by the test modules: in-memory store implementations,
//! canned rule providers and config builders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_graphql::Value;
use async_trait::async_trait;

use crate::config::{Capabilities, FieldConfig, FieldGroupConfig};
use crate::errors::StoreError;
use crate::graphql::fields::FieldKindRegistry;
use crate::graphql::locations::{LocationRuleProvider, LocationRuleSet};
use crate::graphql::SharedBuildData;
use crate::provider::GroupProvider;
use crate::store::{FieldValueStore, OptionsPageRecord, RecordStore, Source};

/// Returns a field config of the given kind.
pub fn field(key: &str, name: &str, kind: &str) -> FieldConfig {
    FieldConfig {
        key: key.to_string(),
        name: name.to_string(),
        label: name.to_string(),
        kind: kind.to_string(),
        ..Default::default()
    }
}

/// Returns a group config with embedded sub-fields.
pub fn group_with_sub_fields(
    key: &str,
    title: &str,
    sub_fields: Vec<FieldConfig>,
) -> FieldGroupConfig {
    FieldGroupConfig {
        key: key.to_string(),
        title: title.to_string(),
        sub_fields: Some(sub_fields),
        ..Default::default()
    }
}

/// Rule provider answering from a fixed map, ignoring the group set.
#[derive(Debug, Default)]
pub struct MapRuleProvider {
    rules: HashMap<String, Vec<String>>,
}

impl MapRuleProvider {
    /// A provider that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A provider with a single rule.
    pub fn single(group_field_name: &str, host_types: &[&str]) -> Self {
        Self::from_pairs(&[(group_field_name, host_types)])
    }

    /// A provider with the given rules.
    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        let rules = pairs
            .iter()
            .map(|(name, types)| {
                (
                    name.to_string(),
                    types.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();
        Self { rules }
    }
}

impl LocationRuleProvider for MapRuleProvider {
    fn determine_rules(&self, _groups: &[Arc<FieldGroupConfig>]) -> LocationRuleSet {
        self.rules
            .iter()
            .map(|(name, types)| (name.clone(), types.clone()))
            .collect()
    }
}

/// Rule provider counting how often the matcher runs.
#[derive(Debug)]
pub struct CountingRuleProvider {
    inner: MapRuleProvider,
    calls: AtomicUsize,
}

impl CountingRuleProvider {
    /// A counting provider with a single rule.
    pub fn single(group_field_name: &str, host_types: &[&str]) -> Self {
        Self {
            inner: MapRuleProvider::single(group_field_name, host_types),
            calls: AtomicUsize::new(0),
        }
    }

    /// How often the matcher ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LocationRuleProvider for CountingRuleProvider {
    fn determine_rules(&self, groups: &[Arc<FieldGroupConfig>]) -> LocationRuleSet {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.determine_rules(groups)
    }
}

/// In-memory field value store keyed by field key and source id.
#[derive(Debug, Default)]
pub struct MemoryValueStore {
    values: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryValueStore {
    /// Returns an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves a string value for a field key on a source.
    pub fn insert(&self, key: &str, source: &str, value: &str) {
        self.values.write().expect("lock poisoned").insert(
            (key.to_string(), source.to_string()),
            Value::String(value.to_string()),
        );
    }
}

#[async_trait]
impl FieldValueStore for MemoryValueStore {
    async fn get(&self, key: &str, source: &Source) -> Result<Option<Value>, StoreError> {
        Ok(self
            .values
            .read()
            .expect("lock poisoned")
            .get(&(key.to_string(), source.as_str().to_string()))
            .cloned())
    }
}

/// In-memory record store tracking every batch it serves.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, OptionsPageRecord>>,
    batches: Mutex<Vec<Vec<String>>>,
    failure: Option<String>,
}

impl MemoryRecordStore {
    /// A store with one bare record per slug.
    pub fn with_pages(slugs: &[&str]) -> Self {
        let store = Self::default();
        for slug in slugs {
            store.insert_page(slug, slug);
        }
        store
    }

    /// A store whose batch fetches always fail.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Saves a record under its slug.
    pub fn insert_page(&self, slug: &str, page_title: &str) {
        self.records.write().expect("lock poisoned").insert(
            slug.to_string(),
            OptionsPageRecord {
                menu_slug: slug.to_string(),
                page_title: Some(page_title.to_string()),
                menu_title: Some(page_title.to_string()),
                parent_id: None,
            },
        );
    }

    /// Every batch served so far, in request order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_record_batch(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Option<OptionsPageRecord>>, StoreError> {
        self.batches
            .lock()
            .expect("lock poisoned")
            .push(keys.to_vec());

        if let Some(message) = &self.failure {
            return Err(StoreError::Backend(message.clone()));
        }

        let records = self.records.read().expect("lock poisoned");
        Ok(keys
            .iter()
            .map(|key| (key.clone(), records.get(key).cloned()))
            .collect())
    }
}

/// Everything a schema build needs, with handles onto the test stores.
pub struct SharedBuildDataFixture {
    /// The build collaborators.
    pub shared: SharedBuildData,

    /// Handle onto the value store for seeding field values.
    pub value_store: Arc<MemoryValueStore>,

    /// Handle onto the record store for seeding options pages.
    pub record_store: Arc<MemoryRecordStore>,
}

/// Returns build collaborators over in-memory stores and a fixed rule map.
pub fn shared_build_data(
    groups: Vec<FieldGroupConfig>,
    rules: &[(&str, &[&str])],
) -> SharedBuildDataFixture {
    let value_store = Arc::new(MemoryValueStore::new());
    let record_store = Arc::new(MemoryRecordStore::default());

    let shared = SharedBuildData {
        groups: GroupProvider::new(groups),
        kinds: Arc::new(FieldKindRegistry::standard()),
        rules: Arc::new(MapRuleProvider::from_pairs(rules)),
        value_store: value_store.clone(),
        record_store: record_store.clone(),
        capabilities: Capabilities::default(),
    };

    SharedBuildDataFixture {
        shared,
        value_store,
        record_store,
    }
}

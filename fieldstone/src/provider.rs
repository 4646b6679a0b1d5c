// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_graphql::indexmap::IndexMap;
use log::{debug, trace};
use tokio::sync::broadcast::{channel, Receiver, Sender};

use crate::config::{FieldConfig, FieldGroupConfig};

/// Provides fast access to the field group configurations known to the host.
///
/// Group configs can be added and updated at runtime; subscribers are
/// informed about changes through a broadcast channel so a new schema can be
/// built from the updated set.
#[derive(Clone, Debug)]
pub struct GroupProvider {
    /// In-memory index of group configs by their unique key.
    groups: Arc<RwLock<IndexMap<String, Arc<FieldGroupConfig>>>>,

    /// Raw (storage-tier) field lists for persisted groups, by group id.
    raw_fields: Arc<RwLock<HashMap<u64, Vec<FieldConfig>>>>,

    /// Sender for broadcast channel informing subscribers about updated
    /// groups.
    tx: Sender<String>,
}

impl GroupProvider {
    /// Returns a `GroupProvider` containing the given group configs.
    ///
    /// Groups backed by persisted storage get their raw field lists from
    /// `update` calls or from their inline `raw_fields` config.
    pub fn new(groups: Vec<FieldGroupConfig>) -> Self {
        let mut index = IndexMap::new();
        for group in groups {
            index.insert(group.key.clone(), Arc::new(group));
        }

        let (tx, _) = channel(64);

        trace!(
            "Initialised group provider with {} field group(s)",
            index.len()
        );

        Self {
            groups: Arc::new(RwLock::new(index)),
            raw_fields: Arc::new(RwLock::new(HashMap::new())),
            tx,
        }
    }

    /// Returns receiver for broadcast channel.
    pub fn on_group_added(&self) -> Receiver<String> {
        self.tx.subscribe()
    }

    /// Retrieve a group config by its key.
    pub fn get(&self, key: &str) -> Option<Arc<FieldGroupConfig>> {
        self.groups.read().expect("lock poisoned").get(key).cloned()
    }

    /// Returns all known group configs in insertion order.
    pub fn all(&self) -> Vec<Arc<FieldGroupConfig>> {
        self.groups
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Returns the group configs that should appear in the GraphQL schema.
    ///
    /// Groups explicitly configured to stay out of the schema are filtered
    /// here so no synthesis step ever sees them.
    pub fn visible(&self) -> Vec<Arc<FieldGroupConfig>> {
        self.all()
            .into_iter()
            .filter(|group| group.show_in_graphql)
            .collect()
    }

    /// Returns the raw (storage-tier) field list of a group, or an empty
    /// list for groups without persisted fields.
    ///
    /// An inline `raw_fields` config takes precedence over the lookup by
    /// group id.
    pub fn raw_fields(&self, group: &FieldGroupConfig) -> Vec<FieldConfig> {
        if let Some(fields) = &group.raw_fields {
            return fields.clone();
        }

        match group.id {
            Some(id) => self
                .raw_fields
                .read()
                .expect("lock poisoned")
                .get(&id)
                .cloned()
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Looks up a single field config by its key across all known groups.
    ///
    /// Used to resolve clone indirections; only storage-tier fields are
    /// searched because cloning never applies to embedded sub-fields.
    pub fn find_field(&self, key: &str) -> Option<FieldConfig> {
        for group in self.all() {
            let fields = self.raw_fields(&group);
            if let Some(field) = fields.iter().find(|field| field.key == key) {
                return Some(field.clone());
            }
        }

        None
    }

    /// Inserts or updates a group config together with its raw field list.
    ///
    /// Returns `true` if an existing group was replaced. Subscribers are
    /// informed about the changed key in either case.
    pub fn update(&self, group: FieldGroupConfig, raw_fields: Vec<FieldConfig>) -> bool {
        let key = group.key.clone();

        if let Some(id) = group.id {
            self.raw_fields
                .write()
                .expect("lock poisoned")
                .insert(id, raw_fields);
        }

        let replaced = self
            .groups
            .write()
            .expect("lock poisoned")
            .insert(key.clone(), Arc::new(group))
            .is_some();

        // Inform subscribers about the new group
        if self.tx.send(key).is_err() {
            debug!("No subscriber has been informed about inserted / updated field group");
        }

        replaced
    }
}

impl Default for GroupProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{FieldConfig, FieldGroupConfig};

    use super::GroupProvider;

    fn group(key: &str, title: &str) -> FieldGroupConfig {
        FieldGroupConfig {
            key: key.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn visible_filters_hidden_groups() {
        let mut hidden = group("g2", "Hidden");
        hidden.show_in_graphql = false;

        let provider = GroupProvider::new(vec![group("g1", "Shown"), hidden]);

        assert_eq!(provider.all().len(), 2);
        let visible = provider.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].key, "g1");
    }

    #[test]
    fn raw_fields_prefer_inline_config() {
        let mut persisted = group("g1", "Persisted");
        persisted.id = Some(7);

        let provider = GroupProvider::default();
        provider.update(
            persisted.clone(),
            vec![FieldConfig {
                key: "field_a".to_string(),
                name: "a".to_string(),
                ..Default::default()
            }],
        );

        assert_eq!(provider.raw_fields(&persisted).len(), 1);

        persisted.raw_fields = Some(Vec::new());
        assert!(provider.raw_fields(&persisted).is_empty());
    }

    #[test]
    fn find_field_searches_storage_tier() {
        let mut persisted = group("g1", "Persisted");
        persisted.id = Some(1);

        let provider = GroupProvider::default();
        provider.update(
            persisted,
            vec![FieldConfig {
                key: "field_headline".to_string(),
                name: "headline".to_string(),
                ..Default::default()
            }],
        );

        assert!(provider.find_field("field_headline").is_some());
        assert!(provider.find_field("field_unknown").is_none());
    }

    #[tokio::test]
    async fn update_informs_subscribers() {
        let provider = GroupProvider::default();
        let mut rx = provider.on_group_added();

        provider.update(group("g1", "Fresh"), Vec::new());

        assert_eq!(rx.recv().await.unwrap(), "g1");
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later

//! Resolves the interface relationships implied by field group cloning.
//!
//! A clone field transcludes another group's fields. The cloning group's
//! generated types therefore implement the cloned group's fields interface,
//! which is what lets consumers select the shared fields through either
//! type. Cloning is a storage-tier feature: only raw field lists are
//! scanned, never embedded sub-fields.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{Capabilities, FieldConfig, FieldGroupConfig};
use crate::graphql::constants;
use crate::graphql::names;
use crate::provider::GroupProvider;

/// Collects the groups referenced as clone targets by any of the given raw
/// fields.
///
/// Broken references are skipped silently; duplicates are removed
/// preserving first-seen order.
pub fn clone_target_groups(
    raw_fields: &[FieldConfig],
    provider: &GroupProvider,
) -> Vec<Arc<FieldGroupConfig>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for field in raw_fields {
        for key in &field.clone_source_keys {
            if !seen.insert(key.clone()) {
                continue;
            }
            if let Some(group) = provider.get(key) {
                targets.push(group);
            }
        }
    }

    targets
}

/// Computes the full interface set of one group's generated types.
///
/// Unions the explicit `interfaces` config, the two fixed interfaces every
/// group implements and, when the cloning capability is active, the fields
/// interface of every cloned group.
pub fn interfaces_for_group(
    group: &FieldGroupConfig,
    type_name: &str,
    provider: &GroupProvider,
    capabilities: Capabilities,
) -> Vec<String> {
    let mut interfaces = group.interfaces.clone();
    interfaces.push(constants::FIELD_GROUP_INTERFACE.to_string());
    interfaces.push(names::fields_interface_name(type_name));

    if capabilities.clone_fields {
        let raw_fields = provider.raw_fields(group);
        for target in clone_target_groups(&raw_fields, provider) {
            if let Some(target_type_name) = names::type_name_for_group(&target) {
                interfaces.push(names::fields_interface_name(&target_type_name));
            }
        }
    }

    let mut seen = HashSet::new();
    interfaces
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::{Capabilities, FieldConfig, FieldGroupConfig};
    use crate::provider::GroupProvider;

    use super::interfaces_for_group;

    fn clone_field(key: &str, sources: &[&str]) -> FieldConfig {
        FieldConfig {
            key: key.to_string(),
            name: key.to_string(),
            kind: "clone".to_string(),
            clone_source_keys: sources.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn group_with_raw_fields(key: &str, title: &str, raw_fields: Vec<FieldConfig>) -> FieldGroupConfig {
        FieldGroupConfig {
            key: key.to_string(),
            title: title.to_string(),
            raw_fields: Some(raw_fields),
            ..Default::default()
        }
    }

    #[test]
    fn every_group_implements_the_fixed_interfaces() {
        let provider = GroupProvider::default();
        let group = group_with_raw_fields("g1", "Hero", Vec::new());

        let interfaces =
            interfaces_for_group(&group, "Hero", &provider, Capabilities::default());

        assert_eq!(
            interfaces,
            vec!["FieldGroup".to_string(), "Hero_Fields".to_string()]
        );
    }

    #[test]
    fn cloned_groups_contribute_their_fields_interface() {
        let provider = GroupProvider::new(vec![
            group_with_raw_fields("group_shared", "Shared Seo", Vec::new()),
        ]);
        let group = group_with_raw_fields(
            "g1",
            "Hero",
            vec![clone_field("field_clone", &["group_shared"])],
        );

        let interfaces =
            interfaces_for_group(&group, "Hero", &provider, Capabilities::default());

        assert!(interfaces.contains(&"SharedSeo_Fields".to_string()));
    }

    #[test]
    fn broken_clone_references_are_skipped() {
        let provider = GroupProvider::default();
        let group = group_with_raw_fields(
            "g1",
            "Hero",
            vec![clone_field("field_clone", &["group_gone"])],
        );

        let interfaces =
            interfaces_for_group(&group, "Hero", &provider, Capabilities::default());

        assert_eq!(
            interfaces,
            vec!["FieldGroup".to_string(), "Hero_Fields".to_string()]
        );
    }

    #[test]
    fn duplicate_targets_are_deduplicated_in_order() {
        let provider = GroupProvider::new(vec![
            group_with_raw_fields("group_a", "Alpha", Vec::new()),
            group_with_raw_fields("group_b", "Beta", Vec::new()),
        ]);
        let group = group_with_raw_fields(
            "g1",
            "Hero",
            vec![
                clone_field("field_one", &["group_b", "group_a"]),
                clone_field("field_two", &["group_a", "group_b"]),
            ],
        );

        let interfaces =
            interfaces_for_group(&group, "Hero", &provider, Capabilities::default());

        assert_eq!(
            interfaces,
            vec![
                "FieldGroup".to_string(),
                "Hero_Fields".to_string(),
                "Beta_Fields".to_string(),
                "Alpha_Fields".to_string(),
            ]
        );
    }

    #[test]
    fn inactive_capability_contributes_no_clone_interfaces() {
        let provider = GroupProvider::new(vec![
            group_with_raw_fields("group_shared", "Shared", Vec::new()),
        ]);
        let group = group_with_raw_fields(
            "g1",
            "Hero",
            vec![clone_field("field_clone", &["group_shared"])],
        );

        let interfaces = interfaces_for_group(
            &group,
            "Hero",
            &provider,
            Capabilities { clone_fields: false },
        );

        assert_eq!(
            interfaces,
            vec!["FieldGroup".to_string(), "Hero_Fields".to_string()]
        );
    }

    #[test]
    fn explicit_interfaces_are_unioned_in() {
        let provider = GroupProvider::default();
        let mut group = group_with_raw_fields("g1", "Hero", Vec::new());
        group.interfaces = vec!["ContentBlock".to_string(), "FieldGroup".to_string()];

        let interfaces =
            interfaces_for_group(&group, "Hero", &provider, Capabilities::default());

        assert_eq!(
            interfaces,
            vec![
                "ContentBlock".to_string(),
                "FieldGroup".to_string(),
                "Hero_Fields".to_string(),
            ]
        );
    }
}

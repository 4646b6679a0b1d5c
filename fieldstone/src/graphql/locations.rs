// SPDX-License-Identifier: AGPL-3.0-or-later

//! Decides which host types a field group attaches to.
//!
//! Explicit configuration always wins; everything else goes through the
//! host's rule matcher, which interprets every group's raw location
//! predicates in one pass. That pass is expensive, so its result is
//! computed at most once per build and looked up per group.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::FieldGroupConfig;
use crate::graphql::names;

/// Host type names per normalized group field name, as derived by the
/// host's location rule matcher.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationRuleSet {
    rules: HashMap<String, Vec<String>>,
}

impl LocationRuleSet {
    /// Returns an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the host types matched for a normalized group field name.
    pub fn insert(&mut self, group_field_name: impl Into<String>, host_types: Vec<String>) {
        self.rules.insert(group_field_name.into(), host_types);
    }

    /// Looks up the host types matched for a normalized group field name.
    pub fn get(&self, group_field_name: &str) -> Option<&[String]> {
        self.rules.get(group_field_name).map(|types| &types[..])
    }

    /// Whether no rule matched anything.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for LocationRuleSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// External rule matcher mapping raw location predicates to host types.
///
/// Invoked over the whole set of groups at once: compute once, look up
/// many times.
pub trait LocationRuleProvider: Send + Sync {
    /// Interprets the location predicates of the given groups and returns
    /// the matched host type names per normalized group field name.
    fn determine_rules(&self, groups: &[Arc<FieldGroupConfig>]) -> LocationRuleSet;
}

/// Deduplicates host type names, preserving first-seen order and dropping
/// empty entries.
fn dedup_host_types(host_types: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    host_types
        .iter()
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

/// Computes the per-build rule set, memoized in `cache`.
///
/// Only groups without explicit host types are handed to the matcher; if
/// every group is explicitly configured the matcher is never invoked.
fn location_rules<'a>(
    all_groups: &[Arc<FieldGroupConfig>],
    cache: &'a OnceCell<LocationRuleSet>,
    provider: &dyn LocationRuleProvider,
) -> &'a LocationRuleSet {
    cache.get_or_init(|| {
        let unconfigured: Vec<_> = all_groups
            .iter()
            .filter(|group| group.graphql_type_names.is_none())
            .cloned()
            .collect();

        if unconfigured.is_empty() {
            LocationRuleSet::default()
        } else {
            provider.determine_rules(&unconfigured)
        }
    })
}

/// Determines the concrete host types one group attaches to.
///
/// A group with `graphql_type_names` explicitly set to an empty list
/// attaches nowhere; that is distinct from leaving the setting out, which
/// falls through to the rule matcher.
pub fn locations_for_group(
    group: &FieldGroupConfig,
    all_groups: &[Arc<FieldGroupConfig>],
    cache: &OnceCell<LocationRuleSet>,
    provider: &dyn LocationRuleProvider,
) -> Vec<String> {
    if !group.show_in_graphql {
        return Vec::new();
    }

    match &group.graphql_type_names {
        Some(explicit) if !group.map_from_location_rules => dedup_host_types(explicit),
        Some(explicit) => {
            // The group asked for rule-derived mapping; its explicit host
            // types remain the fallback when the matcher has nothing for it.
            let rules = location_rules(all_groups, cache, provider);
            match rules.get(&names::rule_lookup_name(group)) {
                Some(matched) => dedup_host_types(matched),
                None => dedup_host_types(explicit),
            }
        }
        None => {
            let rules = location_rules(all_groups, cache, provider);
            rules
                .get(&names::rule_lookup_name(group))
                .map(dedup_host_types)
                .unwrap_or_default()
        }
    }
}

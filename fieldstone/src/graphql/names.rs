// SPDX-License-Identifier: AGPL-3.0-or-later

//! Derives canonical GraphQL type and field names from free-form titles.
//!
//! All functions here are pure: identical raw input always yields identical
//! output within a build. Colliding titles ("My Group" vs "my group!") are
//! a documented limitation handled by the registry's idempotence, not
//! silently "fixed" here.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{FieldConfig, FieldGroupConfig};
use crate::graphql::constants;

/// Matches runs of anything that is not alphanumeric, underscores included.
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\W_]+").expect("valid regex"));

fn ucfirst(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Formats a free-form title as a PascalCase GraphQL type name.
///
/// Non-alphanumeric runs collapse to word boundaries; the rest of each word
/// keeps its casing. Returns an empty string when nothing survives
/// stripping; the caller must treat that as "cannot register".
pub fn format_type_name(raw: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(raw, " ")
        .split_whitespace()
        .map(ucfirst)
        .collect()
}

/// Formats a free-form name as a camelCase GraphQL field name.
///
/// With `is_field` set the result is made a legal leaf field name by
/// prefixing a leading digit.
pub fn format_field_name(raw: &str, is_field: bool) -> String {
    let pascal = format_type_name(raw);
    let mut chars = pascal.chars();
    let name: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };

    if is_field && name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("field{}", name)
    } else {
        name
    }
}

/// The raw name a group contributes to name derivation.
pub fn group_display_name(group: &FieldGroupConfig) -> &str {
    group
        .graphql_field_name
        .as_deref()
        .unwrap_or(&group.title)
}

/// The raw name a field contributes to name derivation.
pub fn field_display_name(field: &FieldConfig) -> &str {
    field.graphql_field_name.as_deref().unwrap_or(&field.name)
}

/// Derives the GraphQL type name of a field group.
///
/// `None` means the group cannot be added to the schema; a diagnostic is
/// emitted for operator visibility and the caller skips the group.
pub fn type_name_for_group(group: &FieldGroupConfig) -> Option<String> {
    let raw = group_display_name(group);
    let type_name = format_type_name(raw);

    if type_name.is_empty() {
        debug!(
            "The graphql name \"{}\" of field group \"{}\" is not valid and cannot be added to the schema",
            raw, group.key
        );
        return None;
    }

    Some(type_name)
}

/// Derives the GraphQL field name of a single field. Empty when the field's
/// name strips down to nothing.
pub fn graphql_field_name(field: &FieldConfig) -> String {
    format_field_name(field_display_name(field), true)
}

/// The normalized name a group is looked up under in the location rule set.
pub fn rule_lookup_name(group: &FieldGroupConfig) -> String {
    format_field_name(group_display_name(group), true)
}

/// Correctly formats the name of a group's fields interface.
pub fn fields_interface_name(type_name: &str) -> String {
    format!("{}{}", type_name, constants::FIELDS_INTERFACE_SUFFIX)
}

/// Correctly formats the name of a group's attachment interface.
pub fn attachment_interface_name(type_name: &str) -> String {
    format!("{}{}", constants::ATTACHMENT_INTERFACE_PREFIX, type_name)
}

/// Correctly formats the name of an options page attachment interface.
pub fn options_attachment_interface_name(type_name: &str) -> String {
    format!(
        "{}{}",
        constants::OPTIONS_ATTACHMENT_INTERFACE_PREFIX,
        type_name
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::config::FieldGroupConfig;

    use super::{format_field_name, format_type_name, type_name_for_group};

    #[rstest]
    #[case("My Group!! 2", "MyGroup2")]
    #[case("hero", "Hero")]
    #[case("hero_section", "HeroSection")]
    #[case("FAQ block", "FAQBlock")]
    #[case("  spaced   out  ", "SpacedOut")]
    #[case("über uns", "ÜberUns")]
    #[case("!!!", "")]
    #[case("", "")]
    fn formats_type_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_type_name(raw), expected);
    }

    #[rstest]
    #[case("My Group!! 2", "myGroup2")]
    #[case("headline", "headline")]
    #[case("hero_image", "heroImage")]
    #[case("2 columns", "field2Columns")]
    fn formats_field_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_field_name(raw, true), expected);
    }

    #[test]
    fn identical_input_yields_identical_output() {
        let first = format_type_name("My Group!! 2");
        let second = format_type_name("My Group!! 2");
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_graphql_name_wins_over_title() {
        let group = FieldGroupConfig {
            key: "g1".to_string(),
            title: "Some Title".to_string(),
            graphql_field_name: Some("CustomName".to_string()),
            ..Default::default()
        };
        assert_eq!(type_name_for_group(&group).unwrap(), "CustomName");
    }

    #[test]
    fn unusable_titles_yield_no_type_name() {
        let group = FieldGroupConfig {
            key: "g1".to_string(),
            title: "!!!".to_string(),
            ..Default::default()
        };
        assert!(type_name_for_group(&group).is_none());
    }
}

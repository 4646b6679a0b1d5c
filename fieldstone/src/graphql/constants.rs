// SPDX-License-Identifier: AGPL-3.0-or-later

//! String identifiers for the fixed graphql types registered on every build
//! as well as derived-name prefixes and field names.

// Type and interface identifiers.

/// Interface implemented by every generated field group object type.
pub const FIELD_GROUP_INTERFACE: &str = "FieldGroup";

/// Interface implemented by every generated `<TypeName>_Fields` interface.
pub const FIELD_GROUP_FIELDS_INTERFACE: &str = "FieldGroupFields";

/// Interface implemented by every generated options page object type.
pub const OPTIONS_PAGE_INTERFACE: &str = "OptionsPage";

/// Shared value object for map field values.
pub const GOOGLE_MAP_OBJECT: &str = "GoogleMap";

/// Shared value object for link field values.
pub const LINK_OBJECT: &str = "Link";

/// Name of the root query object type.
pub const ROOT_QUERY: &str = "Query";

// Derived-name prefixes and suffixes.

/// Suffix of the per-group fields interface, appended to the type name.
pub const FIELDS_INTERFACE_SUFFIX: &str = "_Fields";

/// Prefix of the attachment interface grafted onto host types.
pub const ATTACHMENT_INTERFACE_PREFIX: &str = "WithAcf";

/// Prefix of the attachment interface exposing an options page on the root
/// query type.
pub const OPTIONS_ATTACHMENT_INTERFACE_PREFIX: &str = "WithAcfOptionsPage";

// Field and argument names.

/// Synthetic field present on every field group type.
pub const FIELD_GROUP_NAME_FIELD: &str = "fieldGroupName";

/// Deprecation reason of the synthetic field group name field.
pub const FIELD_GROUP_NAME_DEPRECATION: &str = "Use __typename instead";

/// Identifier field on options pages and host type stubs.
pub const ID_FIELD: &str = "id";

/// Title field of an options page.
pub const PAGE_TITLE_FIELD: &str = "pageTitle";

/// Menu title field of an options page.
pub const MENU_TITLE_FIELD: &str = "menuTitle";

/// Parent identifier field of an options page.
pub const PARENT_ID_FIELD: &str = "parentId";

/// Root query liveness field.
pub const PING_FIELD: &str = "ping";

/// Argument for passing a source id into a host type query.
pub const ID_ARG: &str = "id";

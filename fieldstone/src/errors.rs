// SPDX-License-Identifier: AGPL-3.0-or-later

/// Represents all the ways finalizing the dynamic GraphQL schema can fail.
#[derive(thiserror::Error, Debug)]
pub enum SchemaBuildError {
    /// Error returned by the underlying GraphQL schema builder.
    #[error(transparent)]
    Schema(#[from] async_graphql::dynamic::SchemaError),
}

/// Errors returned from the external field value and record stores.
#[derive(thiserror::Error, Debug, Clone)]
pub enum StoreError {
    /// The backing store failed to answer a lookup.
    #[error("backing store request failed: {0}")]
    Backend(String),
}

/// Errors produced while resolving deferred options page records.
///
/// Cloneable so that one failed batch fetch can fail every handle in the
/// batch with the same error.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// The batched record fetch failed.
    #[error("batched options page fetch failed: {0}")]
    BatchFailed(String),

    /// A handle was read for a key no dispatch has covered yet.
    #[error("no batch dispatch covered key \"{0}\"")]
    NotDispatched(String),
}

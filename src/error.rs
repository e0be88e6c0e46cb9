//! Error types for schema-to-relational mapping operations.
//!
//! Resolution failures are deterministic: the same schema and the same input
//! always fail the same way, so nothing in this crate is retried. Callers are
//! expected to surface `FieldNotFound` and `NotSupported` as bad-request
//! conditions.

use thiserror::Error;

/// Errors raised while mapping filter paths or documents onto relational
/// storage.
#[derive(Debug, Error)]
pub enum MappingError {
    /// No field in the schema matches a segment of the queried path.
    #[error("cannot find field for path at {path}")]
    FieldNotFound { path: String },

    /// A polymorphic relationship was queried with a sub-path the mapping
    /// does not support (anything other than `id`, `value`, `relationTo`,
    /// or a nested field of the target collection).
    #[error("unsupported relationship sub-path at {path}")]
    NotSupported { path: String },

    /// A relationship or filter referenced a collection slug that is not
    /// registered.
    #[error("unknown collection: {slug}")]
    UnknownCollection { slug: String },

    /// A `blockType` filter named a block slug the field does not declare.
    #[error("unknown block type {slug} for field {field}")]
    UnknownBlock { slug: String, field: String },

    /// IO error while loading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error while loading configuration.
    #[error("toml parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type MappingResult<T> = Result<T, MappingError>;

//! Error types for glint_core

use thiserror::Error;

/// Errors raised by models, bindings and the sort engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The object has no property with this name
    #[error("Unknown property '{property}' on {object}")]
    UnknownProperty { object: String, property: String },

    /// An intermediate segment of an attribute path did not hold an object
    #[error("Path '{path}': segment '{segment}' does not hold an object")]
    NotAnObject { path: String, segment: String },

    /// An attribute path with no segments
    #[error("Empty attribute path")]
    EmptyPath,

    /// The object was disposed
    #[error("Object disposed: {0}")]
    Disposed(String),

    /// A property refused the assigned value
    #[error("Invalid value for '{property}': {reason}")]
    InvalidValue { property: String, reason: String },

    /// A read/write transform failed
    #[error("Transform failed: {0}")]
    Transform(String),

    /// A custom comparator or key extractor failed
    #[error("Sort failed: {0}")]
    Sort(String),

    /// A sort spec with no properties and no custom sort
    #[error("Sort spec has no properties")]
    EmptySortSpec,
}

impl CoreError {
    /// Shorthand for a transform failure
    pub fn transform(reason: impl Into<String>) -> Self {
        CoreError::Transform(reason.into())
    }

    /// Shorthand for a sort failure
    pub fn sort(reason: impl Into<String>) -> Self {
        CoreError::Sort(reason.into())
    }
}

/// Result type for glint_core operations
pub type Result<T> = std::result::Result<T, CoreError>;

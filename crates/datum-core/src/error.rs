//! Errors raised while defining classes and invoking their operations

use thiserror::Error;

/// Result type used across the crate
pub type DatumResult<T> = Result<T, DatumError>;

/// Errors that can occur while defining classes or using their instances
#[derive(Debug, Error)]
pub enum DatumError {
    /// Write or delete through a field of a frozen class
    #[error("cannot set or delete field `{field}` on frozen type `{type_name}`")]
    ImmutableField {
        /// Concrete type of the instance
        type_name: String,
        /// Field that was targeted
        field: String,
    },

    /// Constructor called without a value for a mandatory field
    #[error("{type_name}() missing required argument `{field}`")]
    MissingFieldValue {
        /// Type being constructed
        type_name: String,
        /// Field without a value or default
        field: String,
    },

    /// Constructor received more positional arguments than fields
    #[error("{type_name}() takes {expected} positional arguments but {got} were given")]
    TooManyArguments {
        /// Type being constructed
        type_name: String,
        /// Number of fields
        expected: usize,
        /// Number of positional arguments supplied
        got: usize,
    },

    /// Constructor received a keyword that names no field
    #[error("{type_name}() got an unexpected keyword argument `{argument}`")]
    UnexpectedArgument {
        /// Type being constructed
        type_name: String,
        /// Offending keyword
        argument: String,
    },

    /// Constructor received the same field twice
    #[error("{type_name}() got multiple values for argument `{argument}`")]
    DuplicateArgument {
        /// Type being constructed
        type_name: String,
        /// Field supplied twice
        argument: String,
    },

    /// Positional index outside `0..len`
    #[error("{type_name} index {index} out of range (length {len})")]
    IndexOutOfRange {
        /// Concrete type of the instance
        type_name: String,
        /// Requested position
        index: i64,
        /// Number of fields
        len: usize,
    },

    /// Attribute read that has no stored value
    #[error("`{type_name}` object has no attribute `{name}`")]
    MissingAttribute {
        /// Concrete type of the instance
        type_name: String,
        /// Attribute name
        name: String,
    },

    /// Write to a name that is not a declared field
    #[error("`{type_name}` has no field `{name}`")]
    UnknownField {
        /// Concrete type of the instance
        type_name: String,
        /// Attribute name
        name: String,
    },

    /// Operation neither generated nor defined for the type
    #[error("`{type_name}` does not support operation `{operation}`")]
    UnsupportedOperation {
        /// Concrete type
        type_name: String,
        /// Operation name
        operation: String,
    },

    /// Hash requested for a value that is not hashable
    #[error("unhashable type: `{type_name}`")]
    Unhashable {
        /// Type of the offending value
        type_name: String,
    },

    /// Value of the wrong kind passed to or returned from an operation
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected kind
        expected: String,
        /// Actual kind
        got: String,
    },

    /// Class or field name that is not a valid identifier
    #[error("invalid identifier `{name}`")]
    InvalidIdentifier {
        /// Rejected name
        name: String,
    },

    /// Field declared twice on the same class
    #[error("field `{field}` declared twice on `{type_name}`")]
    DuplicateField {
        /// Class being defined
        type_name: String,
        /// Repeated field
        field: String,
    },

    /// Class name already taken in the registry
    #[error("class `{name}` is already defined")]
    DuplicateClass {
        /// Class name
        name: String,
    },

    /// Class lookup by name failed
    #[error("unknown class `{name}`")]
    UnknownClass {
        /// Class name
        name: String,
    },

    /// Parent/child combination that cannot be defined
    #[error("invalid hierarchy for `{type_name}`: {reason}")]
    InvalidHierarchy {
        /// Class being defined
        type_name: String,
        /// Why it was rejected
        reason: String,
    },

    /// JSON schema could not be parsed
    #[error("schema error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML schema could not be parsed
    #[error("schema error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Schema file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatumError {
    /// Shorthand for a [`DatumError::TypeMismatch`]
    pub fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Shorthand for a [`DatumError::UnsupportedOperation`]
    pub fn unsupported(type_name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            type_name: type_name.into(),
            operation: operation.into(),
        }
    }
}

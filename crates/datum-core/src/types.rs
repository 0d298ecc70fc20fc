//! Field declarations as supplied by a front end

use crate::error::{DatumError, DatumResult};
use crate::value::Value;
use serde::Deserialize;
use std::fmt;
use unicode_xid::UnicodeXID;

/// Declared type of a field
///
/// Purely descriptive: stored values are not checked against it. Tooling
/// built on the field collection query (schema dumps, serializers) reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "String")]
pub enum TypeRef {
    /// No declared constraint
    #[default]
    Any,
    /// Boolean
    Bool,
    /// Integer
    Int,
    /// Float
    Float,
    /// String
    Str,
    /// Tuple
    Tuple,
    /// Any other named type (typically another class)
    Named(String),
}

impl TypeRef {
    /// Parse a type name as written in a declaration
    pub fn parse(name: &str) -> Self {
        match name {
            "" | "any" | "Any" => TypeRef::Any,
            "bool" => TypeRef::Bool,
            "int" => TypeRef::Int,
            "float" => TypeRef::Float,
            "str" => TypeRef::Str,
            "tuple" => TypeRef::Tuple,
            other => TypeRef::Named(other.to_string()),
        }
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::parse(&name)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::parse(name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Any => write!(f, "any"),
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::Int => write!(f, "int"),
            TypeRef::Float => write!(f, "float"),
            TypeRef::Str => write!(f, "str"),
            TypeRef::Tuple => write!(f, "tuple"),
            TypeRef::Named(name) => write!(f, "{}", name),
        }
    }
}

/// A field exactly as declared on one class
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Inline default, if the declaration carries one
    pub default: Option<Value>,
}

impl FieldDecl {
    /// Create a mandatory field
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default: None,
        }
    }

    /// Attach a default value
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Whether the declaration carries a default
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Check that `name` is an identifier (`XID_Start | _` followed by `XID_Continue`)
pub fn validate_identifier(name: &str) -> DatumResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first == '_' || first.is_xid_start()) && chars.all(|c| c.is_xid_continue())
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DatumError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

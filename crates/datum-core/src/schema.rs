//! Declarative class definitions loaded from JSON or TOML
//!
//! ```toml
//! [[class]]
//! name = "Point"
//! fields = [
//!     { name = "x", type = "int" },
//!     { name = "y", type = "int", default = 0 },
//! ]
//!
//! [[class]]
//! name = "Tag"
//! frozen = true
//! fields = [{ name = "label", type = "str" }]
//! ```

use crate::class::ClassBuilder;
use crate::error::{DatumError, DatumResult};
use crate::registry::ClassRegistry;
use crate::types::{FieldDecl, TypeRef};
use crate::value::Value;
use serde::Deserialize;
use std::path::Path;

/// A set of class definitions, applied in order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    /// Class entries
    #[serde(default, alias = "class")]
    pub classes: Vec<ClassSchema>,
}

/// One class definition
#[derive(Debug, Clone, Deserialize)]
pub struct ClassSchema {
    /// Class name
    pub name: String,
    /// Parent class name; defaults to the base matching `frozen`
    #[serde(default)]
    pub extends: Option<String>,
    /// Frozen flag; inherited from the parent when absent
    #[serde(default)]
    pub frozen: Option<bool>,
    /// Own fields in order
    #[serde(default, alias = "field")]
    pub fields: Vec<FieldSchema>,
}

/// One field definition
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSchema {
    /// Field name
    pub name: String,
    /// Declared type
    #[serde(default, rename = "type")]
    pub ty: TypeRef,
    /// Inline default; `null` means none
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl Schema {
    /// Parse a JSON schema
    pub fn from_json(text: &str) -> DatumResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a TOML schema
    pub fn from_toml(text: &str) -> DatumResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a schema file, picking the format from the extension
    /// (`.toml` is TOML, anything else JSON)
    pub fn from_path(path: impl AsRef<Path>) -> DatumResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&text),
            _ => Self::from_json(&text),
        }
    }
}

impl FieldSchema {
    fn to_decl(&self) -> DatumResult<FieldDecl> {
        let decl = FieldDecl::new(self.name.clone(), self.ty.clone());
        Ok(match &self.default {
            None | Some(serde_json::Value::Null) => decl,
            Some(json) => decl.with_default(Value::from_json(json)?),
        })
    }
}

impl ClassSchema {
    /// Builder for this entry, resolving the parent in `registry`
    pub fn to_builder(&self, registry: &ClassRegistry) -> DatumResult<ClassBuilder> {
        let parent = match &self.extends {
            Some(name) => registry.lookup(name)?,
            None if self.frozen == Some(true) => registry.frozen_datum().clone(),
            None => registry.datum().clone(),
        };
        if parent.is_frozen() && self.frozen == Some(false) {
            return Err(DatumError::InvalidHierarchy {
                type_name: self.name.clone(),
                reason: format!("mutable class cannot extend frozen class `{}`", parent.name()),
            });
        }

        let mut builder = ClassBuilder::new(self.name.clone()).extends(&parent);
        if self.frozen == Some(true) {
            builder = builder.frozen();
        }
        for field in &self.fields {
            builder = builder.field_decl(field.to_decl()?);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let schema = Schema::from_json(
            r#"{"classes": [{"name": "Point", "fields": [
                {"name": "x", "type": "int"},
                {"name": "y", "type": "int", "default": 0},
                {"name": "z", "default": null}
            ]}]}"#,
        )
        .unwrap();
        let point = &schema.classes[0];
        assert_eq!(point.name, "Point");
        assert_eq!(point.frozen, None);
        assert_eq!(point.fields[0].ty, TypeRef::Int);
        assert_eq!(point.fields[2].ty, TypeRef::Any);
        assert!(point.fields[1].to_decl().unwrap().has_default());
        assert!(!point.fields[2].to_decl().unwrap().has_default());
    }

    #[test]
    fn test_parse_toml() {
        let schema = Schema::from_toml(
            r#"
            [[class]]
            name = "Tag"
            frozen = true
            fields = [{ name = "label", type = "str", default = "none" }]
            "#,
        )
        .unwrap();
        let tag = &schema.classes[0];
        assert_eq!(tag.frozen, Some(true));
        assert_eq!(
            tag.fields[0].to_decl().unwrap().default,
            Some(Value::str("none"))
        );
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            Schema::from_json("{").unwrap_err(),
            DatumError::Json(_)
        ));
    }

    #[test]
    fn test_object_default_rejected() {
        let registry = ClassRegistry::new();
        let schema = Schema::from_json(
            r#"{"classes": [{"name": "Bad", "fields": [{"name": "x", "default": {"a": 1}}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            registry.load_schema(&schema).unwrap_err(),
            DatumError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_unfrozen_child_of_frozen_rejected() {
        let registry = ClassRegistry::new();
        let schema = Schema::from_json(
            r#"{"classes": [
                {"name": "Tag", "frozen": true},
                {"name": "Loose", "extends": "Tag", "frozen": false}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(
            registry.load_schema(&schema).unwrap_err(),
            DatumError::InvalidHierarchy { .. }
        ));
        // Classes before the failing entry stay defined
        assert!(registry.contains("Tag"));
    }
}

//! Immutability layer for frozen classes
//!
//! A frozen class rewrites each field it declares into an [`Accessor`]. The
//! public field name then only reads: the value lives in a hidden storage
//! slot named `<prefix><field>`, and writes or deletes through the public name
//! fail with [`DatumError::ImmutableField`].

use crate::error::{DatumError, DatumResult};
use crate::instance::Instance;
use crate::types::FieldDecl;
use crate::value::Value;
use rustc_hash::FxHashMap;

/// Storage prefix used when none is configured
pub const DEFAULT_STORAGE_PREFIX: &str = "_datum_";

/// Hidden storage slot for `field`
pub fn storage_name(prefix: &str, field: &str) -> String {
    format!("{}{}", prefix, field)
}

/// Read-only view of one field over its hidden storage slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    field: String,
    storage: String,
}

impl Accessor {
    /// Accessor for `field` stored under `prefix`
    pub fn new(field: impl Into<String>, prefix: &str) -> Self {
        let field = field.into();
        let storage = storage_name(prefix, &field);
        Self { field, storage }
    }

    /// Public field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Hidden storage slot
    pub fn storage(&self) -> &str {
        &self.storage
    }

    /// Read the field
    pub fn read(&self, instance: &Instance) -> DatumResult<Value> {
        instance
            .read_slot(&self.storage)
            .ok_or_else(|| DatumError::MissingAttribute {
                type_name: instance.type_name().to_string(),
                name: self.field.clone(),
            })
    }

    /// Writing through an accessor always fails
    pub fn write(&self, instance: &Instance) -> DatumResult<()> {
        Err(self.rejection(instance))
    }

    /// Deleting through an accessor always fails
    pub fn delete(&self, instance: &Instance) -> DatumResult<()> {
        Err(self.rejection(instance))
    }

    fn rejection(&self, instance: &Instance) -> DatumError {
        DatumError::ImmutableField {
            type_name: instance.type_name().to_string(),
            field: self.field.clone(),
        }
    }
}

/// Accessors for a frozen class's own field declarations
///
/// Must run after the class's defaults are recorded: the declarations are the
/// only place the defaults live.
pub(crate) fn rewrite_fields(fields: &[FieldDecl], prefix: &str) -> FxHashMap<String, Accessor> {
    fields
        .iter()
        .map(|f| (f.name.clone(), Accessor::new(f.name.clone(), prefix)))
        .collect()
}

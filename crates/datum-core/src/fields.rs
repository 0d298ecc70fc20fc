//! Field collection across the ancestor chain

use crate::class::{Class, ClassId};
use crate::types::{FieldDecl, TypeRef};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A field as resolved for one class
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Declared type (most-derived declaration wins)
    pub ty: TypeRef,
    /// Class whose declaration is in effect
    pub declared_by: ClassId,
}

/// Ordered, name-unique field list of a class
///
/// Order is constructor argument order, representation order, iteration
/// order and index order.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    /// Fields in order
    fields: Vec<FieldSpec>,
    /// Field name to position
    indices: FxHashMap<String, usize>,
}

impl FieldTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one class's own declarations into the table
    ///
    /// Redeclared names keep their first position and take the new type;
    /// new names are appended.
    pub fn fold(&mut self, class_id: ClassId, decls: &[FieldDecl]) {
        for decl in decls {
            let spec = FieldSpec {
                name: decl.name.clone(),
                ty: decl.ty.clone(),
                declared_by: class_id,
            };
            match self.indices.get(&decl.name) {
                Some(&index) => self.fields[index] = spec,
                None => {
                    self.indices.insert(decl.name.clone(), self.fields.len());
                    self.fields.push(spec);
                }
            }
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the table has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in order
    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.fields.iter()
    }

    /// Field names in order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Field by name
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.indices.get(name).map(|&i| &self.fields[i])
    }

    /// Field by position
    pub fn get_index(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }

    /// Position of a field
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Check if a field exists
    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }
}

impl<'a> IntoIterator for &'a FieldTable {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Resolved fields of `class`, computed once and cached on the class
///
/// Every call for the same class returns the same `Arc`.
pub fn collect_fields(class: &Arc<Class>) -> Arc<FieldTable> {
    class
        .field_table
        .get_or_init(|| {
            let mut table = FieldTable::new();
            for ancestor in class.ancestors() {
                table.fold(ancestor.id(), ancestor.own_fields());
            }
            tracing::trace!(class = class.name(), fields = table.len(), "collected fields");
            Arc::new(table)
        })
        .clone()
}

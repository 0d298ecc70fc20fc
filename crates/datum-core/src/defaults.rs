//! Process-wide table of inline field defaults
//!
//! Defaults are captured from each class's own declarations at definition
//! time, before frozen classes rewrite their fields into accessors. Lookups
//! merge the table along the ancestor chain, base first.

use crate::class::{Class, ClassId};
use crate::types::FieldDecl;
use crate::value::Value;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock};

/// Field name to default value
pub type Defaults = FxHashMap<String, Value>;

/// Own declarations of one class: `Some` carries a default, `None` declares
/// the field without one
type DeclaredDefaults = FxHashMap<String, Option<Value>>;

static DEFAULT_TABLE: LazyLock<DashMap<ClassId, Arc<DeclaredDefaults>>> =
    LazyLock::new(DashMap::new);

/// Record the defaults a class declares itself
///
/// Only the first recording for a class id is kept.
pub(crate) fn record(class_id: ClassId, fields: &[FieldDecl]) {
    DEFAULT_TABLE.entry(class_id).or_insert_with(|| {
        Arc::new(
            fields
                .iter()
                .map(|f| (f.name.clone(), f.default.clone()))
                .collect(),
        )
    });
}

/// Defaults declared directly on one class (no inheritance)
pub fn own_defaults(class_id: ClassId) -> Defaults {
    DEFAULT_TABLE
        .get(&class_id)
        .map(|entry| {
            entry
                .iter()
                .filter_map(|(name, default)| Some((name.clone(), default.clone()?)))
                .collect()
        })
        .unwrap_or_default()
}

/// Defaults visible on `class`, merged base to derived
///
/// A class that redeclares a field without a default removes the inherited
/// one, making the field mandatory again.
pub fn defaults_for(class: &Arc<Class>) -> Defaults {
    let mut merged = Defaults::default();
    for ancestor in class.ancestors() {
        // Clone the Arc out so the shard lock is not held while merging
        let Some(declared) = DEFAULT_TABLE.get(&ancestor.id()).map(|e| e.value().clone()) else {
            continue;
        };
        for (name, default) in declared.iter() {
            match default {
                Some(value) => {
                    merged.insert(name.clone(), value.clone());
                }
                None => {
                    merged.remove(name);
                }
            }
        }
    }
    tracing::trace!(class = class.name(), defaults = merged.len(), "merged defaults");
    merged
}

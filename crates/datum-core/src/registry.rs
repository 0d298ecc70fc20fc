//! Class registry
//!
//! A registry owns the two bootstrap classes, `Datum` and `FrozenDatum`, and
//! every class defined through it, indexed by name.

use crate::class::{Class, ClassBuilder, ClassKind};
use crate::error::{DatumError, DatumResult};
use crate::frozen::DEFAULT_STORAGE_PREFIX;
use crate::schema::Schema;
use crate::synth;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock};

/// Name of the mutable base class
pub const DATUM: &str = "Datum";
/// Name of the frozen base class
pub const FROZEN_DATUM: &str = "FrozenDatum";

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Prefix of the hidden storage slots of frozen fields
    pub storage_prefix: String,
    /// Reject class and field names that are not identifiers
    pub validate_identifiers: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            validate_identifiers: true,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    /// Classes in definition order
    classes: Vec<Arc<Class>>,
    /// Class name to position
    by_name: FxHashMap<String, usize>,
}

impl RegistryInner {
    fn insert(&mut self, class: Arc<Class>) {
        self.by_name
            .insert(class.name().to_string(), self.classes.len());
        self.classes.push(class);
    }
}

/// Named set of datum classes
pub struct ClassRegistry {
    options: RegistryOptions,
    inner: RwLock<RegistryInner>,
    datum: Arc<Class>,
    frozen_datum: Arc<Class>,
}

impl ClassRegistry {
    /// Create a registry with default options
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    /// Create a registry with custom options
    pub fn with_options(options: RegistryOptions) -> Self {
        let prefix: Arc<str> = Arc::from(options.storage_prefix.as_str());

        let datum = synth::datum_registrations()
            .into_iter()
            .fold(ClassBuilder::new(DATUM), |builder, r| {
                builder.generate(r.operation(), r.generator().clone())
            })
            .assemble(ClassKind::Mutable, prefix.clone());

        let frozen_datum = synth::frozen_registrations()
            .into_iter()
            .fold(
                ClassBuilder::new(FROZEN_DATUM).extends(&datum).frozen(),
                |builder, r| builder.generate(r.operation(), r.generator().clone()),
            )
            .assemble(ClassKind::Frozen, prefix);

        let mut inner = RegistryInner::default();
        inner.insert(datum.clone());
        inner.insert(frozen_datum.clone());

        Self {
            options,
            inner: RwLock::new(inner),
            datum,
            frozen_datum,
        }
    }

    /// Registry configuration
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// The mutable base class
    pub fn datum(&self) -> &Arc<Class> {
        &self.datum
    }

    /// The frozen base class
    pub fn frozen_datum(&self) -> &Arc<Class> {
        &self.frozen_datum
    }

    /// Finalize a class declaration and register it
    ///
    /// Name uniqueness is checked and the class inserted under one write
    /// lock, so concurrent definitions of the same name cannot both succeed.
    pub fn define(&self, builder: ClassBuilder) -> DatumResult<Arc<Class>> {
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(builder.name()) {
            return Err(DatumError::DuplicateClass {
                name: builder.name().to_string(),
            });
        }
        let class = builder.finalize(&self.options)?;
        inner.insert(class.clone());
        Ok(class)
    }

    /// Get class by name
    pub fn get(&self, name: &str) -> Option<Arc<Class>> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .and_then(|&i| inner.classes.get(i))
            .cloned()
    }

    /// Get class by name, failing with `UnknownClass`
    pub fn lookup(&self, name: &str) -> DatumResult<Arc<Class>> {
        self.get(name).ok_or_else(|| DatumError::UnknownClass {
            name: name.to_string(),
        })
    }

    /// Check if a class name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    /// Number of classes, bootstrap classes included
    pub fn len(&self) -> usize {
        self.inner.read().classes.len()
    }

    /// Always false: the bootstrap classes are registered on creation
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All classes in definition order
    pub fn classes(&self) -> Vec<Arc<Class>> {
        self.inner.read().classes.clone()
    }

    /// Define every class of a schema, in order
    pub fn load_schema(&self, schema: &Schema) -> DatumResult<Vec<Arc<Class>>> {
        schema
            .classes
            .iter()
            .map(|entry| self.define(entry.to_builder(self)?))
            .collect()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: LazyLock<ClassRegistry> = LazyLock::new(ClassRegistry::new);

/// Process-wide registry
pub fn global() -> &'static ClassRegistry {
    &GLOBAL
}

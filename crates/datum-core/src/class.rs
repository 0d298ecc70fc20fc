//! Class definitions and method dispatch

use crate::defaults;
use crate::error::{DatumError, DatumResult};
use crate::fields::{collect_fields, FieldTable};
use crate::frozen::{self, Accessor};
use crate::generator::{GeneratorHandle, LazyMethod, Registration};
use crate::instance::Instance;
use crate::operation::{native, Args, Invocation, NativeMethod, Operation, Output};
use crate::overrides;
use crate::registry::RegistryOptions;
use crate::synth;
use crate::types::{validate_identifier, FieldDecl, TypeRef};
use crate::value::Value;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Global counter for class identities
static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    pub(crate) fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether instances can be modified after construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Fields can be set and deleted
    Mutable,
    /// Fields are read-only accessors over hidden storage
    Frozen,
}

/// Where a method name resolved to
pub enum MethodRef<'a> {
    /// User-written method in some class's namespace
    User(&'a NativeMethod),
    /// Generator binding owned by `owner`
    Generated {
        /// Class the binding is installed on
        owner: &'a Arc<Class>,
        /// The binding
        method: &'a LazyMethod,
    },
}

/// A finalized class
pub struct Class {
    id: ClassId,
    name: String,
    parent: Option<Arc<Class>>,
    kind: ClassKind,
    /// Own declarations, in order
    fields: Vec<FieldDecl>,
    /// User-written methods declared on this class
    namespace: FxHashMap<String, NativeMethod>,
    /// Read-only accessors for own fields (frozen classes)
    accessors: FxHashMap<String, Accessor>,
    /// Registrations in effect for this class, shared with the parent when unchanged
    registrations: Arc<[Registration]>,
    /// One lazy binding per registration
    bindings: FxHashMap<String, LazyMethod>,
    storage_prefix: Arc<str>,
    pub(crate) field_table: OnceLock<Arc<FieldTable>>,
}

impl Class {
    /// Class ID (unique identifier)
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class (None for root classes)
    pub fn parent(&self) -> Option<&Arc<Class>> {
        self.parent.as_ref()
    }

    /// Mutable or frozen
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Whether fields are read-only after construction
    pub fn is_frozen(&self) -> bool {
        self.kind == ClassKind::Frozen
    }

    /// Fields declared on this class itself
    pub fn own_fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Registrations in effect for this class
    pub fn registrations(&self) -> &Arc<[Registration]> {
        &self.registrations
    }

    /// Whether `name` is a user-written method of this class itself
    pub fn defines(&self, name: &str) -> bool {
        self.namespace.contains_key(name)
    }

    /// Prefix of hidden storage slots
    pub fn storage_prefix(&self) -> &str {
        &self.storage_prefix
    }

    /// Storage slot a field's value is kept in
    pub fn storage_name(&self, field: &str) -> String {
        match self.kind {
            ClassKind::Frozen => frozen::storage_name(&self.storage_prefix, field),
            ClassKind::Mutable => field.to_string(),
        }
    }

    /// Ancestor chain, base first, ending with this class
    pub fn ancestors(self: &Arc<Self>) -> Vec<Arc<Class>> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            chain.push(class.clone());
            current = class.parent.as_ref();
        }
        chain.reverse();
        chain
    }

    /// Whether this class is `other` or derives from it
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.id == other.id {
                return true;
            }
            current = class.parent.as_deref();
        }
        false
    }

    /// Accessor for a field, looked up along the ancestor chain
    pub fn find_accessor(&self, field: &str) -> Option<&Accessor> {
        let mut current = self;
        loop {
            if let Some(accessor) = current.accessors.get(field) {
                return Some(accessor);
            }
            current = current.parent.as_deref()?;
        }
    }

    /// Resolve an operation name: own namespace, then own binding, then parent
    pub fn resolve_method<'a>(self: &'a Arc<Self>, name: &str) -> Option<MethodRef<'a>> {
        let mut current = self;
        loop {
            if let Some(method) = current.namespace.get(name) {
                return Some(MethodRef::User(method));
            }
            if let Some(method) = current.bindings.get(name) {
                return Some(MethodRef::Generated {
                    owner: current,
                    method,
                });
            }
            current = current.parent.as_ref()?;
        }
    }

    /// Whether the generated binding for `operation` on this class has run
    pub fn is_synthesized(&self, operation: &str) -> bool {
        self.bindings
            .get(operation)
            .is_some_and(LazyMethod::is_synthesized)
    }

    /// Operations whose generated implementation exists on this class
    pub fn synthesized_operations(&self) -> Vec<&str> {
        self.registrations
            .iter()
            .map(Registration::operation)
            .filter(|op| self.is_synthesized(op))
            .collect()
    }

    /// Call an operation on this class
    pub fn dispatch(
        self: &Arc<Self>,
        operation: &str,
        receiver: Option<&Instance>,
        args: &Args,
    ) -> DatumResult<Output> {
        let invocation = Invocation {
            class: self,
            receiver,
            args,
        };
        match self.resolve_method(operation) {
            Some(MethodRef::User(method)) => (**method)(&invocation),
            Some(MethodRef::Generated { owner, method }) => {
                (**method.get_or_synthesize(owner))(&invocation)
            }
            None => Err(DatumError::unsupported(self.name(), operation)),
        }
    }

    /// Call a class-level operation (no receiver)
    pub fn invoke_static(self: &Arc<Self>, operation: &str, args: &Args) -> DatumResult<Output> {
        self.dispatch(operation, None, args)
    }

    /// Construct an instance
    pub fn construct(self: &Arc<Self>, args: &Args) -> DatumResult<Instance> {
        match self.invoke_static(Operation::Construct.name(), args)? {
            Output::Instance(instance) => Ok(instance),
            other => Err(DatumError::mismatch("instance", other.kind())),
        }
    }

    /// Construct an instance from positional values
    pub fn call<I, V>(self: &Arc<Self>, values: I) -> DatumResult<Instance>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.construct(&Args::positional(values))
    }

    /// Resolved field table of this class
    pub fn fields(self: &Arc<Self>) -> Arc<FieldTable> {
        collect_fields(self)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("kind", &self.kind)
            .field("fields", &self.fields.iter().map(|f| &f.name).collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Declares a class; finalized through [`crate::ClassRegistry::define`]
pub struct ClassBuilder {
    name: String,
    parent: Option<Arc<Class>>,
    frozen: bool,
    fields: Vec<FieldDecl>,
    methods: Vec<(String, NativeMethod)>,
    generated: Vec<Registration>,
}

impl ClassBuilder {
    /// Start a class declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            frozen: false,
            fields: Vec::new(),
            methods: Vec::new(),
            generated: Vec::new(),
        }
    }

    /// Name of the class being declared
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the parent class
    pub fn extends(mut self, parent: &Arc<Class>) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Make the class frozen (implied when the parent is frozen)
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Declare a mandatory field
    pub fn field(self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.field_decl(FieldDecl::new(name, ty))
    }

    /// Declare a field with an inline default
    pub fn field_with_default(
        self,
        name: impl Into<String>,
        ty: impl Into<TypeRef>,
        default: impl Into<Value>,
    ) -> Self {
        self.field_decl(FieldDecl::new(name, ty).with_default(default))
    }

    /// Declare a field from a prepared declaration
    pub fn field_decl(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    /// Define a user-written method; it wins over any generated one
    pub fn method(mut self, name: impl Into<String>, method: NativeMethod) -> Self {
        self.methods.push((name.into(), method));
        self
    }

    /// Define a user-written method from a closure
    pub fn method_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> DatumResult<Output> + Send + Sync + 'static,
    {
        self.method(name, native(f))
    }

    /// Request generation of `operation` for this class and its subclasses
    pub fn generate(mut self, operation: impl Into<Arc<str>>, generator: GeneratorHandle) -> Self {
        self.generated.push(Registration::new(operation, generator));
        self
    }

    /// Validate the declaration and build the class
    pub(crate) fn finalize(mut self, options: &RegistryOptions) -> DatumResult<Arc<Class>> {
        // Frozen subclasses keep the storage their inherited accessors read
        let storage_prefix: Arc<str> = match &self.parent {
            Some(parent) if parent.is_frozen() => parent.storage_prefix.clone(),
            _ => Arc::from(options.storage_prefix.as_str()),
        };
        self.validate(options, &storage_prefix)?;

        let kind = match &self.parent {
            Some(parent) if parent.is_frozen() => ClassKind::Frozen,
            Some(parent) if self.frozen => {
                if !collect_fields(parent).is_empty() {
                    return Err(DatumError::InvalidHierarchy {
                        type_name: self.name.clone(),
                        reason: format!(
                            "frozen class cannot extend mutable class `{}` with fields",
                            parent.name()
                        ),
                    });
                }
                ClassKind::Frozen
            }
            _ if self.frozen => ClassKind::Frozen,
            _ => ClassKind::Mutable,
        };

        // Becoming frozen below a mutable class (or at the root) brings hashing along
        let newly_frozen = kind == ClassKind::Frozen
            && !self.parent.as_ref().is_some_and(|p| p.is_frozen());
        let hash = Operation::Hash.name();
        if newly_frozen
            && !self.methods.iter().any(|(name, _)| name == hash)
            && !self.generated.iter().any(|r| r.operation() == hash)
        {
            self.generated.extend(synth::frozen_registrations());
        }

        Ok(self.assemble(kind, storage_prefix))
    }

    fn validate(&self, options: &RegistryOptions, prefix: &str) -> DatumResult<()> {
        if options.validate_identifiers {
            validate_identifier(&self.name)?;
        }

        let mut seen = FxHashSet::default();
        for field in &self.fields {
            if options.validate_identifiers {
                validate_identifier(&field.name)?;
            }
            if !prefix.is_empty() && field.name.starts_with(prefix) {
                return Err(DatumError::InvalidIdentifier {
                    name: field.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(DatumError::DuplicateField {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        for (name, _) in &self.methods {
            if self.generated.iter().any(|r| r.operation() == name) {
                return Err(DatumError::InvalidHierarchy {
                    type_name: self.name.clone(),
                    reason: format!("operation `{}` is both defined and generated", name),
                });
            }
        }
        Ok(())
    }

    /// Build the class: capture defaults, rewrite frozen fields, propagate
    /// registrations and bind generators
    pub(crate) fn assemble(self, kind: ClassKind, storage_prefix: Arc<str>) -> Arc<Class> {
        let id = ClassId::next();

        defaults::record(id, &self.fields);
        let accessors = match kind {
            ClassKind::Frozen => frozen::rewrite_fields(&self.fields, &storage_prefix),
            ClassKind::Mutable => FxHashMap::default(),
        };

        let namespace: FxHashMap<String, NativeMethod> = self.methods.into_iter().collect();
        let inherited = self
            .parent
            .as_ref()
            .map(|p| p.registrations.clone())
            .unwrap_or_else(|| Arc::from(Vec::new()));
        let registrations =
            overrides::propagate(&self.name, &inherited, &self.generated, &namespace);
        let bindings = registrations
            .iter()
            .map(|r| (r.operation().to_string(), LazyMethod::new(r.clone())))
            .collect();

        tracing::debug!(
            class = %self.name,
            %id,
            parent = self.parent.as_ref().map(|p| p.name()),
            ?kind,
            fields = self.fields.len(),
            operations = registrations.len(),
            "defined class"
        );

        Arc::new(Class {
            id,
            name: self.name,
            parent: self.parent,
            kind,
            fields: self.fields,
            namespace,
            accessors,
            registrations,
            bindings,
            storage_prefix,
            field_table: OnceLock::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClassRegistry;

    #[test]
    fn test_class_ids_are_unique() {
        let a = ClassId::next();
        let b = ClassId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_ancestors_base_first() {
        let registry = ClassRegistry::new();
        let a = registry
            .define(ClassBuilder::new("A").extends(registry.datum()))
            .unwrap();
        let b = registry.define(ClassBuilder::new("B").extends(&a)).unwrap();

        let names: Vec<_> = b.ancestors().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["Datum", "A", "B"]);
        assert!(b.is_subclass_of(&a));
        assert!(b.is_subclass_of(registry.datum()));
        assert!(!a.is_subclass_of(&b));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let registry = ClassRegistry::new();
        let err = registry
            .define(
                ClassBuilder::new("Bad")
                    .extends(registry.datum())
                    .field("x", "int")
                    .field("x", "str"),
            )
            .unwrap_err();
        assert!(matches!(err, DatumError::DuplicateField { .. }));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let registry = ClassRegistry::new();
        let err = registry
            .define(ClassBuilder::new("Bad Name").extends(registry.datum()))
            .unwrap_err();
        assert!(matches!(err, DatumError::InvalidIdentifier { .. }));

        let err = registry
            .define(
                ClassBuilder::new("Bad")
                    .extends(registry.datum())
                    .field("not-a-name", "int"),
            )
            .unwrap_err();
        assert!(matches!(err, DatumError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_storage_prefixed_field_rejected() {
        let registry = ClassRegistry::new();
        let err = registry
            .define(
                ClassBuilder::new("Sneaky")
                    .extends(registry.frozen_datum())
                    .field("_datum_x", "int"),
            )
            .unwrap_err();
        assert!(matches!(err, DatumError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_frozen_cannot_extend_mutable_with_fields() {
        let registry = ClassRegistry::new();
        let point = registry
            .define(
                ClassBuilder::new("Point")
                    .extends(registry.datum())
                    .field("x", "int"),
            )
            .unwrap();
        let err = registry
            .define(ClassBuilder::new("Frozen").extends(&point).frozen())
            .unwrap_err();
        assert!(matches!(err, DatumError::InvalidHierarchy { .. }));
    }

    #[test]
    fn test_kind_is_inherited() {
        let registry = ClassRegistry::new();
        let frozen = registry
            .define(ClassBuilder::new("F").extends(registry.frozen_datum()))
            .unwrap();
        let child = registry.define(ClassBuilder::new("G").extends(&frozen)).unwrap();
        assert!(frozen.is_frozen());
        assert!(child.is_frozen());
        assert_eq!(child.storage_name("x"), "_datum_x");
    }

    #[test]
    fn test_frozen_child_keeps_parent_prefix() {
        let home = ClassRegistry::new();
        let other = ClassRegistry::with_options(crate::registry::RegistryOptions {
            storage_prefix: "__".to_string(),
            ..Default::default()
        });
        let base = home
            .define(ClassBuilder::new("Base").extends(home.frozen_datum()))
            .unwrap();
        let child = other.define(ClassBuilder::new("Child").extends(&base)).unwrap();
        assert_eq!(child.storage_prefix(), "_datum_");

        // Mutable roots still take the registry's prefix when frozen
        let root = other
            .define(ClassBuilder::new("Root").extends(other.datum()).frozen())
            .unwrap();
        assert_eq!(root.storage_name("x"), "__x");
    }

    #[test]
    fn test_method_and_generate_conflict() {
        let registry = ClassRegistry::new();
        let unit = crate::generator::generator(|_| native(|_| Ok(Output::Unit)));
        let err = registry
            .define(
                ClassBuilder::new("Both")
                    .extends(registry.datum())
                    .method_fn("op", |_| Ok(Output::Unit))
                    .generate("op", unit),
            )
            .unwrap_err();
        assert!(matches!(err, DatumError::InvalidHierarchy { .. }));
    }

    #[test]
    fn test_unsupported_operation() {
        let registry = ClassRegistry::new();
        let point = registry
            .define(ClassBuilder::new("Point").extends(registry.datum()))
            .unwrap();
        let err = point.invoke_static("missing", &Args::new()).unwrap_err();
        assert!(matches!(err, DatumError::UnsupportedOperation { .. }));
    }
}

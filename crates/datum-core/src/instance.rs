//! Datum instances and the typed structural entry points

use crate::class::Class;
use crate::error::{DatumError, DatumResult};
use crate::fields::{collect_fields, FieldTable};
use crate::operation::{Args, Operation, Output};
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

/// Recursive walks over instances that can revisit one through a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Walk {
    Repr,
    Equals,
    Serialize,
}

type VisitKey = (Walk, usize, usize);

thread_local! {
    static ACTIVE: RefCell<FxHashSet<VisitKey>> = RefCell::new(FxHashSet::default());
}

/// Marks a walk over an instance (or a pair) as running on this thread
pub(crate) struct Visit(VisitKey);

impl Visit {
    /// `None` when the same walk is already running further up the stack
    pub(crate) fn enter(walk: Walk, a: &Instance, b: &Instance) -> Option<Visit> {
        let key = (walk, a.addr(), b.addr());
        if ACTIVE.with(|active| active.borrow_mut().insert(key)) {
            Some(Visit(key))
        } else {
            None
        }
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active.borrow_mut().remove(&self.0);
        });
    }
}

struct InstanceData {
    class: Arc<Class>,
    /// Slot name to value; frozen classes key by hidden storage name
    slots: RwLock<FxHashMap<String, Value>>,
}

/// Shared handle to an instance of a datum class
///
/// Cloning the handle aliases the same instance.
#[derive(Clone)]
pub struct Instance(Arc<InstanceData>);

/// Outcome of an equality check between two instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Same class, equal field values
    Equal,
    /// Same class, some field differs
    NotEqual,
    /// Different classes; equality is not defined by this class
    NotComparable,
}

impl Instance {
    pub(crate) fn with_slots(class: Arc<Class>, slots: FxHashMap<String, Value>) -> Self {
        Instance(Arc::new(InstanceData {
            class,
            slots: RwLock::new(slots),
        }))
    }

    /// Concrete class of this instance
    pub fn class(&self) -> &Arc<Class> {
        &self.0.class
    }

    /// Name of the concrete class
    pub fn type_name(&self) -> &str {
        self.0.class.name()
    }

    /// Whether both handles refer to the same instance
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub(crate) fn read_slot(&self, slot: &str) -> Option<Value> {
        self.0.slots.read().get(slot).cloned()
    }

    /// Read a field through its public name
    pub fn get(&self, field: &str) -> DatumResult<Value> {
        if let Some(accessor) = self.0.class.find_accessor(field) {
            return accessor.read(self);
        }
        // Frozen storage is only reachable through accessors
        let value = if self.0.class.is_frozen() {
            None
        } else {
            self.read_slot(field)
        };
        value.ok_or_else(|| DatumError::MissingAttribute {
            type_name: self.type_name().to_string(),
            name: field.to_string(),
        })
    }

    /// Assign a field
    ///
    /// Fails with `ImmutableField` on frozen classes and `UnknownField` for
    /// names that are not fields of the class.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> DatumResult<()> {
        if let Some(accessor) = self.0.class.find_accessor(field) {
            return accessor.write(self);
        }
        self.check_field(field)?;
        self.0.slots.write().insert(field.to_string(), value.into());
        Ok(())
    }

    /// Delete a field's value; later reads fail with `MissingAttribute`
    pub fn delete(&self, field: &str) -> DatumResult<()> {
        if let Some(accessor) = self.0.class.find_accessor(field) {
            return accessor.delete(self);
        }
        self.check_field(field)?;
        match self.0.slots.write().remove(field) {
            Some(_) => Ok(()),
            None => Err(DatumError::MissingAttribute {
                type_name: self.type_name().to_string(),
                name: field.to_string(),
            }),
        }
    }

    fn check_field(&self, field: &str) -> DatumResult<()> {
        if collect_fields(&self.0.class).contains(field) {
            Ok(())
        } else {
            Err(DatumError::UnknownField {
                type_name: self.type_name().to_string(),
                name: field.to_string(),
            })
        }
    }

    /// Shallow copy: a new instance of the same class holding the same values
    pub fn duplicate(&self) -> Instance {
        let slots = self.0.slots.read().clone();
        Instance::with_slots(self.0.class.clone(), slots)
    }

    /// Call any operation of the class on this instance
    pub fn invoke(&self, operation: &str, args: &Args) -> DatumResult<Output> {
        self.0.class.dispatch(operation, Some(self), args)
    }

    fn invoke_op(&self, operation: Operation, args: &Args) -> DatumResult<Output> {
        self.invoke(operation.name(), args)
    }

    /// `TypeName(field=value, ...)`
    ///
    /// An instance reached again while its own representation is being built
    /// renders as `...`.
    pub fn repr(&self) -> DatumResult<String> {
        let Some(_visit) = Visit::enter(Walk::Repr, self, self) else {
            return Ok("...".to_string());
        };
        match self.invoke_op(Operation::Represent, &Args::new())? {
            Output::Text(text) => Ok(text),
            other => Err(DatumError::mismatch("text", other.kind())),
        }
    }

    /// Compare with another instance through this class's equality
    ///
    /// A pair reached again while it is already being compared counts as
    /// equal, so cyclic instances compare by structure.
    pub fn equals(&self, other: &Instance) -> DatumResult<Comparison> {
        let Some(_visit) = Visit::enter(Walk::Equals, self, other) else {
            return Ok(Comparison::Equal);
        };
        let args = Args::new().arg(other.clone());
        match self.invoke_op(Operation::Equals, &args)? {
            Output::Bool(true) => Ok(Comparison::Equal),
            Output::Bool(false) => Ok(Comparison::NotEqual),
            Output::NotComparable => Ok(Comparison::NotComparable),
            other => Err(DatumError::mismatch("bool", other.kind())),
        }
    }

    /// Equality the way `==` resolves it: this class's verdict, then the
    /// other class's, then identity
    ///
    /// Errors raised by either equality operation are returned.
    pub fn try_eq(&self, other: &Instance) -> DatumResult<bool> {
        if self.ptr_eq(other) {
            return Ok(true);
        }
        match self.equals(other)? {
            Comparison::Equal => Ok(true),
            Comparison::NotEqual => Ok(false),
            Comparison::NotComparable => Ok(other.equals(self)? == Comparison::Equal),
        }
    }

    /// [`Instance::try_eq`] for `==`; an error compares unequal
    pub fn loose_eq(&self, other: &Instance) -> bool {
        self.try_eq(other).unwrap_or(false)
    }

    /// Structural hash; only frozen classes provide one
    pub fn hash_value(&self) -> DatumResult<u64> {
        let output = self
            .invoke_op(Operation::Hash, &Args::new())
            .map_err(|e| match e {
                DatumError::UnsupportedOperation { type_name, .. } => {
                    DatumError::Unhashable { type_name }
                }
                other => other,
            })?;
        match output {
            Output::Hash(h) => Ok(h),
            other => Err(DatumError::mismatch("hash", other.kind())),
        }
    }

    /// Fresh iterator over field values in field order
    pub fn iter(&self) -> DatumResult<FieldIter> {
        match self.invoke_op(Operation::Iterate, &Args::new())? {
            Output::Iter(iter) => Ok(iter),
            other => Err(DatumError::mismatch("iterator", other.kind())),
        }
    }

    /// Field value at a position in field order
    pub fn index(&self, position: i64) -> DatumResult<Value> {
        let args = Args::new().arg(position);
        match self.invoke_op(Operation::Index, &args)? {
            Output::Value(value) => Ok(value),
            other => Err(DatumError::mismatch("value", other.kind())),
        }
    }

    /// Number of fields
    pub fn len(&self) -> DatumResult<usize> {
        match self.invoke_op(Operation::Length, &Args::new())? {
            Output::Len(n) => Ok(n),
            other => Err(DatumError::mismatch("length", other.kind())),
        }
    }

    /// Whether the class has no fields
    pub fn is_empty(&self) -> DatumResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Field values in field order, collected
    pub fn values(&self) -> DatumResult<Vec<Value>> {
        self.iter()?.collect()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.loose_eq(other)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "<{} object>", self.type_name()),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One-shot iterator over an instance's field values
pub struct FieldIter {
    instance: Instance,
    fields: Arc<FieldTable>,
    next: usize,
}

impl FieldIter {
    pub(crate) fn new(instance: Instance, fields: Arc<FieldTable>) -> Self {
        Self {
            instance,
            fields,
            next: 0,
        }
    }
}

impl Iterator for FieldIter {
    type Item = DatumResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let field = self.fields.get_index(self.next)?;
        self.next += 1;
        Some(self.instance.get(&field.name))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.fields.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FieldIter {}

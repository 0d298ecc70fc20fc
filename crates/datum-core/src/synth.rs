//! Built-in generators for the structural operations
//!
//! Each generator captures what it needs from the class's field table and
//! defaults at synthesis time and returns a method that only touches the
//! instance. Handles are process-wide statics so every class that inherits a
//! built-in shares the same generator.

use crate::error::{DatumError, DatumResult};
use crate::generator::{GeneratorHandle, Registration, SynthesisContext, Synthesize};
use crate::instance::{FieldIter, Instance};
use crate::operation::{native, NativeMethod, Operation, Output};
use crate::value::Value;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::Hasher;
use std::sync::{Arc, LazyLock};

/// Binds call arguments to fields and stores them
pub struct Construct;
/// `TypeName(field=value, ...)`
pub struct Represent;
/// Field-wise equality within one class
pub struct Equality;
/// Field-wise hash (frozen classes)
pub struct Hashing;
/// Iteration over field values
pub struct Iteration;
/// Positional field access
pub struct Indexing;
/// Field count
pub struct Length;

static CONSTRUCT: LazyLock<GeneratorHandle> = LazyLock::new(|| Arc::new(Construct));
static REPRESENT: LazyLock<GeneratorHandle> = LazyLock::new(|| Arc::new(Represent));
static EQUALITY: LazyLock<GeneratorHandle> = LazyLock::new(|| Arc::new(Equality));
static HASHING: LazyLock<GeneratorHandle> = LazyLock::new(|| Arc::new(Hashing));
static ITERATION: LazyLock<GeneratorHandle> = LazyLock::new(|| Arc::new(Iteration));
static INDEXING: LazyLock<GeneratorHandle> = LazyLock::new(|| Arc::new(Indexing));
static LENGTH: LazyLock<GeneratorHandle> = LazyLock::new(|| Arc::new(Length));

/// Shared generator for a built-in operation
pub fn builtin(operation: Operation) -> &'static GeneratorHandle {
    let handle: &'static LazyLock<GeneratorHandle> = match operation {
        Operation::Construct => &CONSTRUCT,
        Operation::Represent => &REPRESENT,
        Operation::Equals => &EQUALITY,
        Operation::Hash => &HASHING,
        Operation::Iterate => &ITERATION,
        Operation::Index => &INDEXING,
        Operation::Length => &LENGTH,
    };
    LazyLock::force(handle)
}

fn registration(operation: Operation) -> Registration {
    Registration::new(operation.name(), builtin(operation).clone())
}

/// Registrations of the mutable base class
pub fn datum_registrations() -> Vec<Registration> {
    Operation::BASE.into_iter().map(registration).collect()
}

/// Registrations the frozen base class adds
pub fn frozen_registrations() -> Vec<Registration> {
    vec![registration(Operation::Hash)]
}

/// Default value for one construction
///
/// Mutable instances are copied so constructions never share them; all other
/// values are immutable and can be shared.
pub fn fresh_default(default: &Value) -> Value {
    match default {
        Value::Instance(inst) if !inst.class().is_frozen() => Value::Instance(inst.duplicate()),
        other => other.clone(),
    }
}

fn field_names(cx: &SynthesisContext<'_>) -> Arc<[String]> {
    cx.fields.names().map(str::to_string).collect()
}

impl Synthesize for Construct {
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        let fields = cx.fields.clone();
        let names = field_names(cx);
        let storage: Vec<String> = names.iter().map(|f| cx.class.storage_name(f)).collect();
        let defaults: Vec<Option<Value>> = names.iter().map(|f| cx.defaults.get(f).cloned()).collect();

        native(move |inv| {
            let type_name = inv.class.name();
            let args = inv.args;
            let positional = args.positionals();
            if positional.len() > fields.len() {
                return Err(DatumError::TooManyArguments {
                    type_name: type_name.to_string(),
                    expected: fields.len(),
                    got: positional.len(),
                });
            }

            let mut bound: Vec<Option<Value>> = vec![None; fields.len()];
            for (slot, value) in bound.iter_mut().zip(positional) {
                *slot = Some(value.clone());
            }
            for (name, value) in args.keywords() {
                let index = fields
                    .index_of(name)
                    .ok_or_else(|| DatumError::UnexpectedArgument {
                        type_name: type_name.to_string(),
                        argument: name.clone(),
                    })?;
                if bound[index].is_some() {
                    return Err(DatumError::DuplicateArgument {
                        type_name: type_name.to_string(),
                        argument: name.clone(),
                    });
                }
                bound[index] = Some(value.clone());
            }

            let mut slots = FxHashMap::default();
            for (index, value) in bound.into_iter().enumerate() {
                let value = match value.or_else(|| defaults[index].as_ref().map(fresh_default)) {
                    Some(value) => value,
                    None => {
                        return Err(DatumError::MissingFieldValue {
                            type_name: type_name.to_string(),
                            field: names[index].clone(),
                        })
                    }
                };
                slots.insert(storage[index].clone(), value);
            }
            Ok(Output::Instance(Instance::with_slots(inv.class.clone(), slots)))
        })
    }
}

impl Synthesize for Represent {
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        let names = field_names(cx);
        native(move |inv| {
            let receiver = inv.receiver()?;
            let parts = names
                .iter()
                .map(|name| Ok(format!("{}={}", name, receiver.get(name)?.repr()?)))
                .collect::<DatumResult<Vec<_>>>()?;
            Ok(Output::Text(format!(
                "{}({})",
                receiver.type_name(),
                parts.join(", ")
            )))
        })
    }
}

impl Synthesize for Equality {
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        let names = field_names(cx);
        native(move |inv| {
            let receiver = inv.receiver()?;
            let Some(Value::Instance(other)) = inv.args.first() else {
                return Ok(Output::NotComparable);
            };
            if receiver.class().id() != other.class().id() {
                return Ok(Output::NotComparable);
            }
            if receiver.ptr_eq(other) {
                return Ok(Output::Bool(true));
            }
            for name in names.iter() {
                if !receiver.get(name)?.try_eq(&other.get(name)?)? {
                    return Ok(Output::Bool(false));
                }
            }
            Ok(Output::Bool(true))
        })
    }
}

impl Synthesize for Hashing {
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        let names = field_names(cx);
        native(move |inv| {
            let receiver = inv.receiver()?;
            let mut hasher = FxHasher::default();
            hasher.write_usize(names.len());
            for name in names.iter() {
                receiver.get(name)?.hash_into(&mut hasher)?;
            }
            Ok(Output::Hash(hasher.finish()))
        })
    }
}

impl Synthesize for Iteration {
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        let fields = cx.fields.clone();
        native(move |inv| {
            let receiver = inv.receiver()?;
            Ok(Output::Iter(FieldIter::new(receiver.clone(), fields.clone())))
        })
    }
}

impl Synthesize for Indexing {
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        let names = field_names(cx);
        native(move |inv| {
            let receiver = inv.receiver()?;
            let position = match inv.args.first() {
                Some(Value::Int(i)) => *i,
                Some(other) => return Err(DatumError::mismatch("int", other.type_name())),
                None => return Err(DatumError::mismatch("int", "nothing")),
            };
            let name = usize::try_from(position)
                .ok()
                .and_then(|i| names.get(i))
                .ok_or_else(|| DatumError::IndexOutOfRange {
                    type_name: receiver.type_name().to_string(),
                    index: position,
                    len: names.len(),
                })?;
            Ok(Output::Value(receiver.get(name)?))
        })
    }
}

impl Synthesize for Length {
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        let len = cx.fields.len();
        native(move |_| Ok(Output::Len(len)))
    }
}

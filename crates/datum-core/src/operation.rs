//! Structural operations and the uniform calling convention
//!
//! Every method a class exposes, whether written by hand or synthesized, is a
//! [`NativeMethod`]: it receives an [`Invocation`] (concrete class, optional
//! receiver, arguments) and returns a typed [`Output`].

use crate::class::Class;
use crate::error::{DatumError, DatumResult};
use crate::instance::{FieldIter, Instance};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Callable bound to a class under an operation name
pub type NativeMethod = Arc<dyn Fn(&Invocation<'_>) -> DatumResult<Output> + Send + Sync>;

/// Wrap a closure as a [`NativeMethod`]
pub fn native<F>(f: F) -> NativeMethod
where
    F: Fn(&Invocation<'_>) -> DatumResult<Output> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The structural operations every datum class supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Build an instance from field values
    Construct,
    /// `TypeName(f1=v1, ...)`
    Represent,
    /// Field-wise equality against an instance of the same class
    Equals,
    /// Hash of all field values (frozen classes only)
    Hash,
    /// Field values in declaration order
    Iterate,
    /// Field value at a position
    Index,
    /// Number of fields
    Length,
}

impl Operation {
    /// Operations registered on every datum class
    pub const BASE: [Operation; 6] = [
        Operation::Construct,
        Operation::Represent,
        Operation::Equals,
        Operation::Iterate,
        Operation::Index,
        Operation::Length,
    ];

    /// Name the operation is registered and looked up under
    pub const fn name(self) -> &'static str {
        match self {
            Operation::Construct => "construct",
            Operation::Represent => "repr",
            Operation::Equals => "eq",
            Operation::Hash => "hash",
            Operation::Iterate => "iter",
            Operation::Index => "index",
            Operation::Length => "len",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Positional and keyword arguments of a call
#[derive(Debug, Clone, Default)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl Args {
    /// Empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments only
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keywords: Vec::new(),
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    /// Positional arguments in call order
    pub fn positionals(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword arguments in call order
    pub fn keywords(&self) -> &[(String, Value)] {
        &self.keywords
    }

    /// First positional argument
    pub fn first(&self) -> Option<&Value> {
        self.positional.first()
    }

    /// Total number of arguments
    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    /// Check if no arguments were given
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }
}

/// One call of a method
pub struct Invocation<'a> {
    /// Concrete class the call was dispatched on
    pub class: &'a Arc<Class>,
    /// Instance the method was called on (`None` for constructors)
    pub receiver: Option<&'a Instance>,
    /// Call arguments
    pub args: &'a Args,
}

impl<'a> Invocation<'a> {
    /// The receiver, or an error for class-level calls
    pub fn receiver(&self) -> DatumResult<&'a Instance> {
        self.receiver
            .ok_or_else(|| DatumError::mismatch("instance receiver", self.class.name()))
    }
}

/// Result of a method call
pub enum Output {
    /// A freshly constructed instance
    Instance(Instance),
    /// A field value
    Value(Value),
    /// A textual representation
    Text(String),
    /// An equality verdict
    Bool(bool),
    /// The operands cannot be compared by this method
    NotComparable,
    /// A hash code
    Hash(u64),
    /// Lazy iteration over field values
    Iter(FieldIter),
    /// A length
    Len(usize),
    /// No result
    Unit,
}

impl Output {
    /// Short name of the variant, used in mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Output::Instance(_) => "instance",
            Output::Value(_) => "value",
            Output::Text(_) => "text",
            Output::Bool(_) => "bool",
            Output::NotComparable => "not comparable",
            Output::Hash(_) => "hash",
            Output::Iter(_) => "iterator",
            Output::Len(_) => "length",
            Output::Unit => "unit",
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Instance(inst) => write!(f, "Instance({:?})", inst),
            Output::Value(v) => write!(f, "Value({:?})", v),
            Output::Text(s) => write!(f, "Text({:?})", s),
            Output::Bool(b) => write!(f, "Bool({})", b),
            Output::NotComparable => write!(f, "NotComparable"),
            Output::Hash(h) => write!(f, "Hash({:#x})", h),
            Output::Iter(_) => write!(f, "Iter"),
            Output::Len(n) => write!(f, "Len({})", n),
            Output::Unit => write!(f, "Unit"),
        }
    }
}

//! Lazy, per-class method synthesis
//!
//! A [`Registration`] pairs an operation name with a generator. Each class
//! that inherits or requests a registration gets its own [`LazyMethod`]
//! binding. The first call through a binding collects the class's fields and
//! defaults, runs the generator once, and keeps the resulting method; later
//! calls go straight to it.
//!
//! Racing first calls are serialized by `OnceLock`: exactly one thread runs
//! the generator, the others block and then see the finished method.

use crate::class::Class;
use crate::defaults::{defaults_for, Defaults};
use crate::fields::{collect_fields, FieldTable};
use crate::operation::NativeMethod;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Inputs a generator specializes against
pub struct SynthesisContext<'a> {
    /// Class the method is being bound to
    pub class: &'a Arc<Class>,
    /// The class's resolved fields
    pub fields: &'a Arc<FieldTable>,
    /// Merged defaults along the ancestor chain
    pub defaults: &'a Defaults,
}

/// Produces a class-specialized implementation of one operation
///
/// Generators are stateless across classes. A generator must not invoke the
/// operation it is synthesizing on the class being synthesized.
pub trait Synthesize: Send + Sync {
    /// Build the implementation for `cx.class`
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod;
}

impl<F> Synthesize for F
where
    F: Fn(&SynthesisContext<'_>) -> NativeMethod + Send + Sync,
{
    fn synthesize(&self, cx: &SynthesisContext<'_>) -> NativeMethod {
        self(cx)
    }
}

/// Shared handle to a generator
pub type GeneratorHandle = Arc<dyn Synthesize>;

/// Wrap a closure as a generator handle
pub fn generator<F>(f: F) -> GeneratorHandle
where
    F: Fn(&SynthesisContext<'_>) -> NativeMethod + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An operation a class supports through generation
#[derive(Clone)]
pub struct Registration {
    operation: Arc<str>,
    generator: GeneratorHandle,
}

impl Registration {
    /// Register `generator` under `operation`
    pub fn new(operation: impl Into<Arc<str>>, generator: GeneratorHandle) -> Self {
        Self {
            operation: operation.into(),
            generator,
        }
    }

    /// Operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The generator
    pub fn generator(&self) -> &GeneratorHandle {
        &self.generator
    }

    /// Same operation backed by the same generator
    pub fn same_as(&self, other: &Registration) -> bool {
        self.operation == other.operation && Arc::ptr_eq(&self.generator, &other.generator)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// A registration bound to one class, synthesized on first use
pub struct LazyMethod {
    registration: Registration,
    compiled: OnceLock<NativeMethod>,
}

impl LazyMethod {
    /// Fresh, not yet synthesized binding
    pub fn new(registration: Registration) -> Self {
        Self {
            registration,
            compiled: OnceLock::new(),
        }
    }

    /// Operation name
    pub fn operation(&self) -> &str {
        self.registration.operation()
    }

    /// The registration this binding came from
    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Whether the generator has already run
    pub fn is_synthesized(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// The specialized method for `owner`, synthesizing it on first call
    pub fn get_or_synthesize(&self, owner: &Arc<Class>) -> &NativeMethod {
        self.compiled.get_or_init(|| {
            let fields = collect_fields(owner);
            let defaults = defaults_for(owner);
            tracing::debug!(
                class = owner.name(),
                operation = self.operation(),
                fields = fields.len(),
                "synthesizing method"
            );
            self.registration.generator().synthesize(&SynthesisContext {
                class: owner,
                fields: &fields,
                defaults: &defaults,
            })
        })
    }
}

impl fmt::Debug for LazyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyMethod")
            .field("operation", &self.operation())
            .field("synthesized", &self.is_synthesized())
            .finish()
    }
}

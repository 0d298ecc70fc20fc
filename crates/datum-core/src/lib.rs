//! Datum: value objects generated from declared fields
//!
//! A class declares an ordered list of fields. Construction, representation,
//! equality, iteration, positional access and length (plus hashing for frozen
//! classes) are synthesized per class on first use, specialized to the
//! class's fields and defaults, and inherited correctly by subclasses.
//!
//! ```
//! use datum_core::{ClassBuilder, ClassRegistry};
//!
//! let registry = ClassRegistry::new();
//! let point = registry
//!     .define(
//!         ClassBuilder::new("Point")
//!             .extends(registry.datum())
//!             .field("x", "int")
//!             .field_with_default("y", "int", 0),
//!     )
//!     .unwrap();
//!
//! let p = point.call([1]).unwrap();
//! assert_eq!(p.repr().unwrap(), "Point(x=1, y=0)");
//! assert_eq!(p.len().unwrap(), 2);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod defaults;
pub mod error;
pub mod fields;
pub mod frozen;
pub mod generator;
pub mod instance;
pub mod operation;
pub mod overrides;
pub mod registry;
pub mod schema;
mod serialize;
pub mod synth;
pub mod types;
pub mod value;

pub use class::{Class, ClassBuilder, ClassId, ClassKind, MethodRef};
pub use defaults::{defaults_for, own_defaults, Defaults};
pub use error::{DatumError, DatumResult};
pub use fields::{collect_fields, FieldSpec, FieldTable};
pub use frozen::{Accessor, DEFAULT_STORAGE_PREFIX};
pub use generator::{generator, GeneratorHandle, LazyMethod, Registration, SynthesisContext, Synthesize};
pub use instance::{Comparison, FieldIter, Instance};
pub use operation::{native, Args, Invocation, NativeMethod, Operation, Output};
pub use registry::{global, ClassRegistry, RegistryOptions, DATUM, FROZEN_DATUM};
pub use schema::{ClassSchema, FieldSchema, Schema};
pub use types::{FieldDecl, TypeRef};
pub use value::Value;

//! Dynamic values stored in instance fields
//!
//! Values are immutable once built: strings and tuples are reference-counted
//! slices, so cloning a value (for example a field default) never aliases
//! mutable state. The only shared-mutable payload is [`Instance`], which is a
//! handle to an object of some class.

use crate::error::{DatumError, DatumResult};
use crate::instance::Instance;
use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

/// A field value
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable UTF-8 string
    Str(Arc<str>),
    /// Immutable ordered sequence
    Tuple(Arc<[Value]>),
    /// Handle to an object of a registered class
    Instance(Instance),
}

impl Value {
    /// Build a string value
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Build a tuple value
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    /// Check if this value is `None`
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Extract an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Extract a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the instance payload
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    /// Name of the value's type (the class name for instances)
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Instance(inst) => inst.type_name().to_string(),
        }
    }

    /// Detailed rendering used inside representations
    ///
    /// Strings are quoted and escaped, floats always carry a fractional part,
    /// and instances render through their own `repr` operation.
    pub fn repr(&self) -> DatumResult<String> {
        Ok(match self {
            Value::None => "None".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Str(s) => format!("{:?}", &**s),
            Value::Tuple(items) => {
                let parts = items
                    .iter()
                    .map(Value::repr)
                    .collect::<DatumResult<Vec<_>>>()?;
                if parts.len() == 1 {
                    format!("({},)", parts[0])
                } else {
                    format!("({})", parts.join(", "))
                }
            }
            Value::Instance(inst) => inst.repr()?,
        })
    }

    /// Feed this value into a hasher
    ///
    /// Fails for mutable instances, which do not offer a hash operation.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) -> DatumResult<()> {
        match self {
            Value::None => state.write_u8(0),
            Value::Bool(b) => {
                state.write_u8(1);
                state.write_u8(*b as u8);
            }
            Value::Int(i) => {
                state.write_u8(2);
                state.write_i64(*i);
            }
            Value::Float(f) => {
                state.write_u8(3);
                // 0.0 == -0.0, so they must hash alike
                let bits = if *f == 0.0 { 0u64 } else { f.to_bits() };
                state.write_u64(bits);
            }
            Value::Str(s) => {
                state.write_u8(4);
                state.write(s.as_bytes());
                state.write_u8(0xff);
            }
            Value::Tuple(items) => {
                state.write_u8(5);
                state.write_usize(items.len());
                for item in items.iter() {
                    item.hash_into(state)?;
                }
            }
            Value::Instance(inst) => {
                state.write_u8(6);
                state.write_u64(inst.hash_value()?);
            }
        }
        Ok(())
    }

    /// Kind-strict equality that reports errors from instance equality
    pub fn try_eq(&self, other: &Value) -> DatumResult<bool> {
        Ok(match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.try_eq(y)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Value::Instance(a), Value::Instance(b)) => a.try_eq(b)?,
            _ => false,
        })
    }

    /// Convert a JSON value (schema defaults, CLI arguments)
    ///
    /// Arrays become tuples. Objects have no value counterpart and are rejected.
    pub fn from_json(json: &serde_json::Value) -> DatumResult<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::str(s.as_str()),
            serde_json::Value::Array(items) => Value::Tuple(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<DatumResult<Vec<_>>>()?
                    .into(),
            ),
            serde_json::Value::Object(_) => {
                return Err(DatumError::mismatch("scalar or array", "object"))
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "<{} object>", self.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

impl From<Instance> for Value {
    fn from(inst: Instance) -> Self {
        Value::Instance(inst)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::None)
    }
}

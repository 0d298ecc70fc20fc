//! serde serialization of values and instances
//!
//! Instances serialize as a map of their fields in field order.

use crate::error::DatumResult;
use crate::fields::collect_fields;
use crate::instance::{Instance, Visit, Walk};
use crate::value::Value;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Instance(inst) => inst.serialize(serializer),
        }
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(_visit) = Visit::enter(Walk::Serialize, self, self) else {
            return Err(S::Error::custom(format!(
                "cyclic reference through `{}`",
                self.type_name()
            )));
        };
        let fields = collect_fields(self.class());
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields.iter() {
            let value = self.get(&field.name).map_err(S::Error::custom)?;
            map.serialize_entry(&field.name, &value)?;
        }
        map.end()
    }
}

impl Instance {
    /// Fields as a JSON object
    pub fn to_json(&self) -> DatumResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

//! Value — the opaque native value passed through uniform invokers
//!
//! Every registered callable, whatever its Rust signature, receives a
//! `Vec<Value>` and returns one `Value`. The variants mirror the primitive
//! kinds the wire format can tag explicitly:
//!
//! ```text
//! Void                  "no value" result of a void callable
//! Null                  absent value (JSON null)
//! Bool/Byte/Char        bool, u8, char
//! Short/Int/Long        i16, i32, i64
//! LongLong              i128
//! Float/Double          f32, f64
//! String                owned UTF-8 string
//! Array                 heterogeneous sequence
//! Map                   string-keyed mapping
//! Json                  structured value passed through untouched
//! Object                composite instance (type name + boxed Any)
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as Json;

use crate::error::{Error, Result};

/// Native value handle for uniform invokers.
pub enum Value {
    /// Result of a callable that returns nothing
    Void,
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Unsigned byte
    Byte(u8),
    /// Single Unicode scalar
    Char(char),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 128-bit integer
    LongLong(i128),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Owned string
    String(String),
    /// Sequence of independently typed values
    Array(Vec<Value>),
    /// String-keyed mapping
    Map(BTreeMap<String, Value>),
    /// Structured JSON the caller interprets itself
    Json(Json),
    /// Composite instance
    Object(Instance),
}

impl Value {
    /// Wire type label of this value.
    ///
    /// Arrays report `<elem>[]` when every element shares one label and
    /// `any[]` otherwise.
    pub fn type_name(&self) -> Cow<'_, str> {
        match self {
            Value::Void => Cow::Borrowed("void"),
            Value::Null => Cow::Borrowed("null"),
            Value::Bool(_) => Cow::Borrowed("bool"),
            Value::Byte(_) => Cow::Borrowed("byte"),
            Value::Char(_) => Cow::Borrowed("char"),
            Value::Short(_) => Cow::Borrowed("short"),
            Value::Int(_) => Cow::Borrowed("int"),
            Value::Long(_) => Cow::Borrowed("long"),
            Value::LongLong(_) => Cow::Borrowed("long long"),
            Value::Float(_) => Cow::Borrowed("float"),
            Value::Double(_) => Cow::Borrowed("double"),
            Value::String(_) => Cow::Borrowed("string"),
            Value::Array(items) => Value::array_type_name(items),
            Value::Map(_) => Cow::Borrowed("map"),
            Value::Json(_) => Cow::Borrowed("object"),
            Value::Object(instance) => Cow::Borrowed(instance.type_name()),
        }
    }

    /// Label of a sequence: `<elem>[]` when every element shares one label,
    /// `any[]` otherwise.
    pub fn array_type_name(items: &[Value]) -> Cow<'static, str> {
        let mut labels = items.iter().map(Value::type_name);
        match labels.next() {
            Some(first) if labels.all(|label| label == first) => Cow::Owned(format!("{}[]", first)),
            _ => Cow::Borrowed("any[]"),
        }
    }

    /// True for `Null` and `Void`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Void)
    }

    /// True for the void-call marker
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Integer payload of any integer kind, widened
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Byte(v) => Some(i128::from(*v)),
            Value::Short(v) => Some(i128::from(*v)),
            Value::Int(v) => Some(i128::from(*v)),
            Value::Long(v) => Some(i128::from(*v)),
            Value::LongLong(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating payload of a float kind, widened
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the composite instance
    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Structural JSON encoding.
    ///
    /// Composite instances are handed to `object`; everything else is
    /// encoded here.
    pub fn to_json_with(&self, object: &dyn Fn(&Instance) -> Result<Json>) -> Result<Json> {
        Ok(match self {
            Value::Void | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Byte(v) => Json::from(*v),
            Value::Char(c) => Json::String(c.to_string()),
            Value::Short(v) => Json::from(*v),
            Value::Int(v) => Json::from(*v),
            Value::Long(v) => Json::from(*v),
            Value::LongLong(v) => {
                if let Ok(small) = i64::try_from(*v) {
                    Json::from(small)
                } else if let Ok(unsigned) = u64::try_from(*v) {
                    Json::from(unsigned)
                } else {
                    // Out of JSON number range; the explicit "long long" tag parses it back.
                    Json::String(v.to_string())
                }
            }
            Value::Float(v) => float_json(f64::from(*v)),
            Value::Double(v) => float_json(*v),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(
                items
                    .iter()
                    .map(|item| item.to_json_with(object))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json_with(object)?)))
                    .collect::<Result<serde_json::Map<_, _>>>()?,
            ),
            Value::Json(json) => json.clone(),
            Value::Object(instance) => object(instance)?,
        })
    }

    /// Structural JSON encoding of a value that holds no composite instances.
    pub fn to_plain_json(&self) -> Result<Json> {
        self.to_json_with(&|instance| {
            Err(Error::UnsupportedValueType(instance.type_name().to_string()))
        })
    }
}

/// JSON has no literal for non-finite floats; they travel as strings that
/// `str::parse::<f64>` accepts.
fn float_json(v: f64) -> Json {
    match serde_json::Number::from_f64(v) {
        Some(n) => Json::Number(n),
        None if v.is_nan() => Json::String("NaN".to_string()),
        None if v.is_sign_negative() => Json::String("-inf".to_string()),
        None => Json::String("inf".to_string()),
    }
}

impl From<Json> for Value {
    /// Plain structural conversion with no type-tag interpretation.
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Long(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(entries) => {
                Value::Map(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl PartialEq for Value {
    /// Composite instances never compare equal; everything else compares by
    /// variant and payload.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::LongLong(a), Value::LongLong(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "Void"),
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({})", v),
            Value::Byte(v) => write!(f, "Byte({})", v),
            Value::Char(v) => write!(f, "Char({:?})", v),
            Value::Short(v) => write!(f, "Short({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Long(v) => write!(f, "Long({})", v),
            Value::LongLong(v) => write!(f, "LongLong({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Double(v) => write!(f, "Double({})", v),
            Value::String(v) => write!(f, "String({:?})", v),
            Value::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Value::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Value::Json(v) => write!(f, "Json({})", v),
            Value::Object(v) => write!(f, "{:?}", v),
        }
    }
}

// ============================================================================
// Instance
// ============================================================================

/// Type-erased composite value, owned by whichever `Value` holds it.
pub struct Instance {
    type_name: String,
    value: Box<dyn Any + Send>,
}

impl Instance {
    /// Wrap `value` under the wire type name `type_name`
    pub fn new<T: Any + Send>(type_name: impl Into<String>, value: T) -> Self {
        Instance {
            type_name: type_name.into(),
            value: Box::new(value),
        }
    }

    /// Wire type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Rust type of the boxed value
    pub fn value_type_id(&self) -> TypeId {
        Any::type_id(&*self.value)
    }

    /// Borrow the boxed value as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the boxed value as `T`, handing the instance back on mismatch
    pub fn downcast<T: Any>(self) -> std::result::Result<T, Instance> {
        let Instance { type_name, value } = self;
        match value.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(value) => Err(Instance { type_name, value }),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.type_name)
    }
}

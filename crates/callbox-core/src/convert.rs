//! Conversion between [`Value`] and Rust types
//!
//! Implement [`FromValue`] to let a type be received as a callable argument and
//! [`IntoValue`] to let it be returned. Both build on [`NativeType`], which
//! names the type for listings and error messages.
//!
//! Integer targets accept any integer kind whose value fits; nothing is
//! silently truncated. Composite user types get all three traits from
//! [`composite!`](crate::composite).
//!
//! # Example
//!
//! ```ignore
//! #[derive(Default, Serialize, Deserialize)]
//! struct Point { x: f64, y: f64 }
//!
//! callbox_core::composite!(Point, "geo.Point");
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::error::TypeMismatch;
use crate::value::Value;

/// Static wire type label of a Rust type.
pub trait NativeType {
    /// Label used in listings and mismatch errors
    fn type_name() -> Cow<'static, str>;
}

/// Checked coercion from a [`Value`].
pub trait FromValue: NativeType + Sized {
    /// Convert, or report what was expected and what arrived
    fn from_value(value: Value) -> Result<Self, TypeMismatch>;
}

/// Conversion of a return value into a [`Value`].
pub trait IntoValue: NativeType {
    /// Convert
    fn into_value(self) -> Value;
}

/// Mismatch error for target type `T` given `value`
pub fn mismatch<T: NativeType + ?Sized>(value: &Value) -> TypeMismatch {
    TypeMismatch {
        expected: T::type_name().into_owned(),
        got: value.type_name().into_owned(),
    }
}

// ============================================================================
// Primitive Type Implementations
// ============================================================================

macro_rules! impl_integer {
    ($($ty:ty => $name:literal, $variant:ident;)*) => {$(
        impl NativeType for $ty {
            fn type_name() -> Cow<'static, str> {
                Cow::Borrowed($name)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                value
                    .as_integer()
                    .and_then(|wide| <$ty>::try_from(wide).ok())
                    .ok_or_else(|| mismatch::<$ty>(&value))
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    )*};
}

impl_integer! {
    u8 => "byte", Byte;
    i16 => "short", Short;
    i32 => "int", Int;
    i64 => "long", Long;
    i128 => "long long", LongLong;
}

impl NativeType for f64 {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("double")
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        let widened = match &value {
            Value::Float(_) | Value::Double(_) => value.as_double(),
            _ => value.as_integer().map(|i| i as f64),
        };
        widened.ok_or_else(|| mismatch::<f64>(&value))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl NativeType for f32 {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("float")
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Double(d) if !d.is_finite() || d.abs() <= f64::from(f32::MAX) => Ok(d as f32),
            ref other => other
                .as_integer()
                .map(|i| i as f32)
                .ok_or_else(|| mismatch::<f32>(other)),
        }
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl NativeType for bool {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("bool")
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch::<bool>(&other)),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl NativeType for char {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("char")
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Char(c) => Ok(c),
            Value::String(ref s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(mismatch::<char>(&value)),
                }
            }
            other => Err(mismatch::<char>(&other)),
        }
    }
}

impl IntoValue for char {
    fn into_value(self) -> Value {
        Value::Char(self)
    }
}

impl NativeType for String {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("string")
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::String(s) => Ok(s),
            Value::Char(c) => Ok(c.to_string()),
            other => Err(mismatch::<String>(&other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl NativeType for &str {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("string")
    }
}

// Unit type (for callables that return nothing)
impl NativeType for () {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("void")
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Void
    }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: NativeType> NativeType for Vec<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("{}[]", T::type_name()))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Array(items) => {
                let got = Value::array_type_name(&items).into_owned();
                items
                    .into_iter()
                    .map(T::from_value)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| TypeMismatch {
                        expected: Self::type_name().into_owned(),
                        got,
                    })
            }
            Value::Null => Ok(Vec::new()),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: NativeType> NativeType for Option<T> {
    fn type_name() -> Cow<'static, str> {
        T::type_name()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::Null,
        }
    }
}

/// Entries of a mapping value, accepting opaque JSON objects structurally.
fn map_entries(value: Value) -> Result<BTreeMap<String, Value>, Value> {
    match value {
        Value::Map(entries) => Ok(entries),
        Value::Json(json @ Json::Object(_)) => match Value::from(json) {
            Value::Map(entries) => Ok(entries),
            other => Err(other),
        },
        other => Err(other),
    }
}

macro_rules! impl_map {
    ($($map:ident),*) => {$(
        impl<T: NativeType> NativeType for $map<String, T> {
            fn type_name() -> Cow<'static, str> {
                Cow::Owned(format!("map<string, {}>", T::type_name()))
            }
        }

        impl<T: FromValue> FromValue for $map<String, T> {
            fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                let entries = map_entries(value).map_err(|other| mismatch::<Self>(&other))?;
                entries
                    .into_iter()
                    .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                    .collect()
            }
        }

        impl<T: IntoValue> IntoValue for $map<String, T> {
            fn into_value(self) -> Value {
                Value::Map(self.into_iter().map(|(k, v)| (k, v.into_value())).collect())
            }
        }
    )*};
}

impl_map!(BTreeMap, HashMap);

impl NativeType for Json {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("object")
    }
}

impl FromValue for Json {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Json(json) => Ok(json),
            other => other.to_plain_json().map_err(|_| mismatch::<Json>(&other)),
        }
    }
}

impl IntoValue for Json {
    fn into_value(self) -> Value {
        Value::Json(self)
    }
}

impl NativeType for Value {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("any")
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        Ok(value)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

// ============================================================================
// Composite Types
// ============================================================================

/// `FromValue` body shared by every [`composite!`](crate::composite) type.
///
/// Accepts an instance of exactly `T`, or an opaque JSON object / mapping
/// that deserializes into `T`.
pub fn composite_from_value<T>(value: Value) -> Result<T, TypeMismatch>
where
    T: NativeType + DeserializeOwned + Any,
{
    match value {
        Value::Object(instance) => instance.downcast::<T>().map_err(|instance| TypeMismatch {
            expected: T::type_name().into_owned(),
            got: instance.type_name().to_string(),
        }),
        Value::Json(json) => serde_json::from_value(json).map_err(|e| TypeMismatch {
            expected: T::type_name().into_owned(),
            got: format!("object ({})", e),
        }),
        other @ Value::Map(_) => {
            let json = other.to_plain_json().map_err(|_| mismatch::<T>(&other))?;
            serde_json::from_value(json).map_err(|_| mismatch::<T>(&other))
        }
        other => Err(mismatch::<T>(&other)),
    }
}

/// Implement [`NativeType`], [`FromValue`] and [`IntoValue`] for a serde type.
///
/// The optional second argument is the wire type name; it defaults to the
/// Rust type name.
#[macro_export]
macro_rules! composite {
    ($ty:ty) => {
        $crate::composite!($ty, stringify!($ty));
    };
    ($ty:ty, $name:expr) => {
        impl $crate::NativeType for $ty {
            fn type_name() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed($name)
            }
        }

        impl $crate::FromValue for $ty {
            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::TypeMismatch> {
                $crate::convert::composite_from_value(value)
            }
        }

        impl $crate::IntoValue for $ty {
            fn into_value(self) -> $crate::Value {
                $crate::Value::Object($crate::Instance::new($name, self))
            }
        }
    };
}

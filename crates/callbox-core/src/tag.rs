//! Built-in scalar type tags
//!
//! Tags are the names accepted in `"<tag>:<text>"` strings and in the `type`
//! field of `{"type": ..., "value": ...}` objects. Each tag knows how to parse
//! its own literal text and how to read itself out of a JSON scalar.

use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::value::Value;

/// A built-in scalar kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `byte` (u8)
    Byte,
    /// `char`
    Char,
    /// `short` (i16)
    Short,
    /// `int` (i32)
    Int,
    /// `long` (i64)
    Long,
    /// `long long` (i128)
    LongLong,
    /// `float` (f32)
    Float,
    /// `double` (f64)
    Double,
    /// `string`
    String,
}

impl ScalarKind {
    /// All kinds, in encode precedence order
    pub const ALL: [ScalarKind; 10] = [
        ScalarKind::Bool,
        ScalarKind::Byte,
        ScalarKind::Char,
        ScalarKind::Short,
        ScalarKind::Int,
        ScalarKind::Long,
        ScalarKind::LongLong,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::String,
    ];

    /// Canonical wire name
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Byte => "byte",
            ScalarKind::Char => "char",
            ScalarKind::Short => "short",
            ScalarKind::Int => "int",
            ScalarKind::Long => "long",
            ScalarKind::LongLong => "long long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::String => "string",
        }
    }

    /// Look up a tag by canonical name or alias
    pub fn from_name(name: &str) -> Option<ScalarKind> {
        Some(match name {
            "bool" | "boolean" => ScalarKind::Bool,
            "byte" | "u8" => ScalarKind::Byte,
            "char" => ScalarKind::Char,
            "short" | "i16" => ScalarKind::Short,
            "int" | "integer" | "i32" => ScalarKind::Int,
            "long" | "i64" => ScalarKind::Long,
            "long long" | "longlong" | "i128" => ScalarKind::LongLong,
            "float" | "f32" => ScalarKind::Float,
            "double" | "f64" => ScalarKind::Double,
            "string" | "str" | "String" => ScalarKind::String,
            _ => return None,
        })
    }

    /// Parse the text after the `:` of an explicit string tag.
    pub fn parse(self, text: &str) -> Result<Value> {
        let fail = || Error::ValueParse {
            text: text.to_string(),
            target: self.name().to_string(),
        };
        Ok(match self {
            ScalarKind::Bool => match text {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(fail()),
            },
            ScalarKind::Byte => Value::Byte(text.trim().parse().map_err(|_| fail())?),
            ScalarKind::Short => Value::Short(text.trim().parse().map_err(|_| fail())?),
            ScalarKind::Int => Value::Int(text.trim().parse().map_err(|_| fail())?),
            ScalarKind::Long => Value::Long(text.trim().parse().map_err(|_| fail())?),
            ScalarKind::LongLong => Value::LongLong(text.trim().parse().map_err(|_| fail())?),
            ScalarKind::Float => {
                let f: f32 = text.trim().parse().map_err(|_| fail())?;
                // "1e39" parses to inf; only spelled-out infinities may
                if f.is_infinite() && text.trim().parse::<f64>().map_or(false, f64::is_finite) {
                    return Err(fail());
                }
                Value::Float(f)
            }
            ScalarKind::Double => Value::Double(text.trim().parse().map_err(|_| fail())?),
            ScalarKind::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Char(c),
                    _ => return Err(fail()),
                }
            }
            ScalarKind::String => Value::String(text.to_string()),
        })
    }

    /// Read the `value` field of an explicit object tag.
    ///
    /// Strings go through [`ScalarKind::parse`], after dropping a
    /// `"<tag>:"` prefix naming this same kind; numbers are range-checked
    /// against the target width; `null` stays absent.
    pub fn from_json(self, json: &Json) -> Result<Value> {
        let fail = || Error::ValueParse {
            text: json.to_string(),
            target: self.name().to_string(),
        };
        match json {
            Json::Null => Ok(Value::Null),
            Json::String(text) => match split_tagged(text) {
                Some((kind, literal)) if kind == self && self != ScalarKind::String => self.parse(literal),
                _ => self.parse(text),
            },
            Json::Bool(b) => match self {
                ScalarKind::Bool => Ok(Value::Bool(*b)),
                ScalarKind::String => Ok(Value::String(b.to_string())),
                _ => Err(fail()),
            },
            Json::Number(n) => match self {
                ScalarKind::Byte
                | ScalarKind::Short
                | ScalarKind::Int
                | ScalarKind::Long
                | ScalarKind::LongLong => {
                    let wide = match (n.as_i64(), n.as_u64(), n.as_f64()) {
                        (Some(i), _, _) => i128::from(i),
                        (None, Some(u), _) => i128::from(u),
                        (None, None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e38 => f as i128,
                        _ => return Err(fail()),
                    };
                    narrow(self, wide).ok_or_else(fail)
                }
                ScalarKind::Float => n.as_f64().and_then(narrow_float).map(Value::Float).ok_or_else(fail),
                ScalarKind::Double => n.as_f64().map(Value::Double).ok_or_else(fail),
                ScalarKind::String => Ok(Value::String(n.to_string())),
                ScalarKind::Bool | ScalarKind::Char => Err(fail()),
            },
            Json::Array(_) | Json::Object(_) => match self {
                ScalarKind::String => Ok(Value::String(json.to_string())),
                _ => Err(fail()),
            },
        }
    }
}

/// Fit a wide integer into an integer kind, `None` when out of range.
fn narrow(kind: ScalarKind, wide: i128) -> Option<Value> {
    Some(match kind {
        ScalarKind::Byte => Value::Byte(u8::try_from(wide).ok()?),
        ScalarKind::Short => Value::Short(i16::try_from(wide).ok()?),
        ScalarKind::Int => Value::Int(i32::try_from(wide).ok()?),
        ScalarKind::Long => Value::Long(i64::try_from(wide).ok()?),
        ScalarKind::LongLong => Value::LongLong(wide),
        _ => return None,
    })
}

/// Narrow to f32, `None` when a finite value overflows.
pub(crate) fn narrow_float(wide: f64) -> Option<f32> {
    let narrow = wide as f32;
    if narrow.is_infinite() && wide.is_finite() {
        None
    } else {
        Some(narrow)
    }
}

/// Split an explicit string tag into its kind and literal text.
///
/// Only the first `:` separates; a prefix that is not a known tag means the
/// string is plain text.
pub fn split_tagged(text: &str) -> Option<(ScalarKind, &str)> {
    let (prefix, rest) = text.split_once(':')?;
    ScalarKind::from_name(prefix).map(|kind| (kind, rest))
}

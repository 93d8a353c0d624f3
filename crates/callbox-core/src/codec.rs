//! JSON ⇄ [`Value`] codec
//!
//! # Decoding
//!
//! ```text
//! null                               → Null
//! {"type": T, "value": v}            → explicit: scalar T, T[] sequence, or composite T
//! "T:text" with T a scalar tag       → explicit scalar, text parsed as T
//! "text"                             → String
//! integer                            → Long
//! float within f32 range             → Float
//! any other number                   → Double
//! [a, b, ...]                        → Array, each element decoded on its own
//! {...} without "type"               → Json, passed through
//! ```
//!
//! The number rules are a lossy default: `short`/`int`/`long` and
//! `float`/`double` cannot be told apart from bare JSON, which is why the
//! explicit forms exist. A bare `5.6` becomes the nearest f32.
//!
//! Inside a declared scalar type (an explicit object's `value`, or an
//! element of a `T[]` sequence) a `"T:text"` string naming that same type
//! is accepted as well as bare `"text"`.
//!
//! # Encoding
//!
//! Scalars, arrays and maps encode structurally; composite instances go
//! through the converter registered for their Rust type, and fail with
//! `UnsupportedValueType` when there is none.

use serde_json::{json, Value as Json};

use crate::error::{Error, Result};
use crate::tag::{narrow_float, split_tagged, ScalarKind};
use crate::types::TypeRegistry;
use crate::value::Value;

/// Suffix marking a sequence type tag, e.g. `int[]`
const ARRAY_SUFFIX: &str = "[]";

/// Codec bound to one composite type registry.
#[derive(Clone, Copy)]
pub struct Codec<'a> {
    types: &'a TypeRegistry,
}

impl<'a> Codec<'a> {
    /// Create a codec over `types`
    pub fn new(types: &'a TypeRegistry) -> Self {
        Codec { types }
    }

    // ========================================================================
    // Native → JSON
    // ========================================================================

    /// Encode a value as bare JSON.
    pub fn encode(&self, value: &Value) -> Result<Json> {
        value.to_json_with(&|instance| self.types.convert(instance))
    }

    /// Encode a value as `{"type": ..., "value": ...}`, which decodes back to
    /// the same kind.
    pub fn encode_tagged(&self, value: &Value) -> Result<Json> {
        Ok(json!({
            "type": value.type_name(),
            "value": self.encode(value)?,
        }))
    }

    // ========================================================================
    // JSON → Native
    // ========================================================================

    /// Decode `json`, treating `hint` as the declared type when the JSON
    /// itself carries no explicit tag.
    pub fn decode(&self, json: &Json, hint: Option<&str>) -> Result<Value> {
        if let Some(tag) = explicit_tag(json) {
            return self.decode_tagged(tag, json.get("value"));
        }
        if let Some(hint) = hint {
            return self.decode_tagged(hint, Some(json));
        }
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Long(i)
                } else if n.is_u64() {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    narrow_float(f).map_or(Value::Double(f), Value::Float)
                }
            }
            Json::String(text) => match split_tagged(text) {
                Some((kind, literal)) => kind.parse(literal)?,
                None => Value::String(text.clone()),
            },
            Json::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.decode(item, None))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Json::Object(_) => Value::Json(json.clone()),
        })
    }

    /// Parse JSON text and decode it with no hint.
    pub fn decode_str(&self, text: &str) -> Result<Value> {
        let json: Json = serde_json::from_str(text).map_err(|_| Error::ValueParse {
            text: text.to_string(),
            target: "json".to_string(),
        })?;
        self.decode(&json, None)
    }

    /// Decode `value` as type `tag`: scalar kind, `T[]` sequence, or
    /// registered composite.
    pub fn decode_tagged(&self, tag: &str, value: Option<&Json>) -> Result<Value> {
        let tag = tag.trim();
        let value = value.unwrap_or(&Json::Null);

        if let Some(element) = tag.strip_suffix(ARRAY_SUFFIX) {
            return match value {
                Json::Null => Ok(Value::Null),
                Json::Array(items) => Ok(Value::Array(
                    items
                        .iter()
                        .map(|item| self.decode(item, Some(element)))
                        .collect::<Result<Vec<_>>>()?,
                )),
                other => Err(Error::ValueParse {
                    text: other.to_string(),
                    target: tag.to_string(),
                }),
            };
        }

        if let Some(kind) = ScalarKind::from_name(tag) {
            return kind.from_json(value);
        }

        match tag {
            "void" | "null" => Ok(Value::Null),
            "object" | "json" => Ok(Value::Json(value.clone())),
            "any" => self.decode(value, None),
            name => {
                let text = match value {
                    Json::Null => String::new(),
                    other => other.to_string(),
                };
                self.types.resolve(name, &text).map(Value::Object)
            }
        }
    }
}

/// The `type` field of an explicit `{"type": ..., "value": ...}` object.
fn explicit_tag(json: &Json) -> Option<&str> {
    json.as_object()?.get("type")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Instance;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct User {
        id: i64,
        name: String,
    }

    fn registry() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.register::<User>("pkg.User");
        types
    }

    #[test]
    fn test_explicit_string_tag_wins() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        assert_eq!(codec.decode(&json!("long:42"), None).unwrap(), Value::Long(42));
        assert_eq!(codec.decode(&json!("42"), None).unwrap(), Value::String("42".into()));
        assert_eq!(codec.decode_str("42").unwrap(), Value::Long(42));
    }

    #[test]
    fn test_unknown_prefix_is_plain_string() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        assert_eq!(
            codec.decode(&json!("note:hello"), None).unwrap(),
            Value::String("note:hello".into())
        );
    }

    #[test]
    fn test_bad_literal_is_parse_error() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        assert_eq!(
            codec.decode(&json!("int:abc"), None).unwrap_err(),
            Error::ValueParse {
                text: "abc".to_string(),
                target: "int".to_string(),
            }
        );
        assert!(codec.decode(&json!("bool:yes"), None).is_err());
    }

    #[test]
    fn test_number_precedence() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        assert_eq!(codec.decode(&json!(7), None).unwrap(), Value::Long(7));
        assert_eq!(codec.decode(&json!(0.5), None).unwrap(), Value::Float(0.5));
        assert_eq!(codec.decode(&json!(5.6), None).unwrap(), Value::Float(5.6));
        assert_eq!(codec.decode(&json!(0.1), None).unwrap(), Value::Float(0.1));
        assert_eq!(codec.decode(&json!(1e300), None).unwrap(), Value::Double(1e300));
        assert_eq!(
            codec.decode(&json!(u64::MAX), None).unwrap(),
            Value::Double(u64::MAX as f64)
        );
    }

    #[test]
    fn test_explicit_object_forms() {
        let types = registry();
        let codec = Codec::new(&types);

        let short = codec.decode(&json!({"type": "short", "value": 3}), None).unwrap();
        assert_eq!(short, Value::Short(3));

        let ints = codec
            .decode(&json!({"type": "int[]", "value": [1, "2", {"type": "int", "value": 3}]}), None)
            .unwrap();
        assert_eq!(ints, Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));

        let user = codec
            .decode(&json!({"type": "pkg.User", "value": {"id": 9, "name": "Ann"}}), None)
            .unwrap();
        let instance = user.as_object().unwrap();
        assert_eq!(
            instance.downcast_ref::<User>(),
            Some(&User {
                id: 9,
                name: "Ann".to_string()
            })
        );
    }

    #[test]
    fn test_missing_value_builds_default_instance() {
        let types = registry();
        let codec = Codec::new(&types);
        let user = codec.decode(&json!({"type": "pkg.User"}), None).unwrap();
        assert_eq!(user.as_object().unwrap().downcast_ref::<User>(), Some(&User::default()));
    }

    #[test]
    fn test_unknown_type_tag() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        assert_eq!(
            codec.decode(&json!({"type": "Ghost", "value": {}}), None).unwrap_err(),
            Error::UnknownType("Ghost".to_string())
        );
    }

    #[test]
    fn test_hint_applies_to_untagged_json() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        assert_eq!(codec.decode(&json!(5), Some("byte")).unwrap(), Value::Byte(5));
        assert_eq!(codec.decode(&json!("long:5"), Some("long")).unwrap(), Value::Long(5));
        assert_eq!(
            codec.decode(&json!("long:5"), Some("int")).unwrap_err(),
            Error::ValueParse {
                text: "long:5".to_string(),
                target: "int".to_string(),
            }
        );
    }

    #[test]
    fn test_tagged_strings_inside_declared_types() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        assert_eq!(
            codec.decode(&json!({"type": "long[]", "value": ["long:1", 2]}), None).unwrap(),
            Value::Array(vec![Value::Long(1), Value::Long(2)])
        );
        assert_eq!(
            codec.decode(&json!({"type": "int", "value": "int:7"}), None).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn test_object_without_type_passes_through() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        let json = json!({"id": 1});
        assert_eq!(codec.decode(&json, None).unwrap(), Value::Json(json));
    }

    #[test]
    fn test_encode_instances() {
        let types = registry();
        let codec = Codec::new(&types);
        let user = Value::Object(Instance::new(
            "pkg.User",
            User {
                id: 1,
                name: "Kim".to_string(),
            },
        ));
        assert_eq!(codec.encode(&user).unwrap(), json!({"id": 1, "name": "Kim"}));

        let unknown = Value::Object(Instance::new("Opaque", 3u16));
        assert_eq!(
            codec.encode(&unknown).unwrap_err(),
            Error::UnsupportedValueType("Opaque".to_string())
        );
    }

    #[test]
    fn test_tagged_round_trip_extremes() {
        let types = TypeRegistry::new();
        let codec = Codec::new(&types);
        let samples = vec![
            Value::Bool(false),
            Value::Byte(0),
            Value::Byte(u8::MAX),
            Value::Char('\u{10FFFF}'),
            Value::Short(i16::MIN),
            Value::Int(-1),
            Value::Int(i32::MAX),
            Value::Long(i64::MIN),
            Value::LongLong(i128::MAX),
            Value::LongLong(i128::MIN),
            Value::Float(f32::MAX),
            Value::Float(-0.5),
            Value::Double(f64::MIN),
            Value::Double(0.0),
            Value::String(String::new()),
            Value::String("long:1".to_string()),
        ];
        for value in samples {
            let encoded = codec.encode_tagged(&value).unwrap();
            assert_eq!(codec.decode(&encoded, None).unwrap(), value, "{}", encoded);
        }
    }
}

//! Composite type registry
//!
//! Maps wire type names to constructors that build an [`Instance`] from JSON
//! text, and Rust types to converters that turn an instance back into JSON.
//! The codec consults it whenever a type tag is not a built-in kind, and
//! whenever it meets an `Object` value while encoding.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::value::Instance;

/// Builds an instance from JSON text; empty text means "default instance".
pub type Constructor = Box<dyn Fn(&str) -> Result<Instance> + Send + Sync>;

/// Encodes an instance of one Rust type.
pub type Converter = Box<dyn Fn(&Instance) -> Result<Json> + Send + Sync>;

struct TypeEntry {
    constructor: Constructor,
    type_id: Option<TypeId>,
}

/// Registry of composite types, keyed by wire name and by Rust type.
#[derive(Default)]
pub struct TypeRegistry {
    entries: HashMap<String, TypeEntry>,
    converters: HashMap<TypeId, Converter>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name` with serde-derived constructor and converter.
    ///
    /// Registering a name twice replaces the earlier entry.
    pub fn register<T>(&mut self, name: &str)
    where
        T: Serialize + DeserializeOwned + Default + Any + Send,
    {
        let type_name = name.to_string();
        let constructor: Constructor = Box::new(move |text: &str| {
            let value = if text.trim().is_empty() {
                T::default()
            } else {
                serde_json::from_str::<T>(text).map_err(|e| Error::Construct {
                    type_name: type_name.clone(),
                    message: e.to_string(),
                })?
            };
            Ok(Instance::new(type_name.clone(), value))
        });
        self.insert(name, constructor, Some(TypeId::of::<T>()));
        self.register_converter::<T>(|value| {
            serde_json::to_value(value).map_err(|e| Error::UnsupportedValueType(e.to_string()))
        });
    }

    /// Register a raw constructor under `name`.
    pub fn register_constructor(
        &mut self,
        name: &str,
        constructor: impl Fn(&str) -> Result<Instance> + Send + Sync + 'static,
    ) {
        self.insert(name, Box::new(constructor), None);
    }

    /// Register the encode-side converter for instances holding a `T`.
    pub fn register_converter<T: Any>(
        &mut self,
        converter: impl Fn(&T) -> Result<Json> + Send + Sync + 'static,
    ) {
        let converter: Converter = Box::new(move |instance: &Instance| {
            match instance.downcast_ref::<T>() {
                Some(value) => converter(value),
                None => Err(Error::UnsupportedValueType(instance.type_name().to_string())),
            }
        });
        self.converters.insert(TypeId::of::<T>(), converter);
    }

    fn insert(&mut self, name: &str, constructor: Constructor, type_id: Option<TypeId>) {
        let previous = self.entries.insert(
            name.to_string(),
            TypeEntry {
                constructor,
                type_id,
            },
        );
        if previous.is_some() {
            tracing::debug!(type_name = name, "replaced composite type");
        } else {
            tracing::debug!(type_name = name, "registered composite type");
        }
    }

    /// Remove `name`. The converter goes too once no other name maps to the
    /// same Rust type. Returns whether the name was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(entry) = self.entries.remove(name) else {
            return false;
        };
        if let Some(type_id) = entry.type_id {
            let still_used = self.entries.values().any(|e| e.type_id == Some(type_id));
            if !still_used {
                self.converters.remove(&type_id);
            }
        }
        true
    }

    /// Construct an instance of `name` from JSON text.
    pub fn resolve(&self, name: &str, json: &str) -> Result<Instance> {
        match self.entries.get(name) {
            Some(entry) => (entry.constructor)(json),
            None => Err(Error::UnknownType(name.to_string())),
        }
    }

    /// Encode an instance through the converter for its Rust type.
    pub fn convert(&self, instance: &Instance) -> Result<Json> {
        match self.converters.get(&instance.value_type_id()) {
            Some(converter) => converter(instance),
            None => Err(Error::UnsupportedValueType(instance.type_name().to_string())),
        }
    }

    /// Check whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered type names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no names are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

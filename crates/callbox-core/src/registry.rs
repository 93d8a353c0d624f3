//! Callable registry
//!
//! Maps dotted paths to uniform invokers. Paths are unique: registering a
//! path again replaces the earlier callable.
//!
//! Bound methods carry a backing instance that every call on the path
//! mutates in place. The instance is either supplied by the host
//! ([`Binding::External`]) or default-constructed once at registration and
//! owned by the registry ([`Binding::Owned`]). Owned instances are shared
//! per owner path and Rust type, so `obj.setValue` and `obj.getValue`
//! registered separately still see the same object.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::adapter::{handle, Function, Handle, Invoker, Method, Signature};
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::types::TypeRegistry;
use crate::value::Value;

/// How a callable relates to a backing instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Free function, no instance
    Static,
    /// Method on an instance the registry default-constructed and owns
    Owned,
    /// Method on an instance the host supplied and keeps a handle to
    External,
}

/// A registered callable.
pub struct Callable {
    invoker: Invoker,
    signature: Signature,
    binding: Binding,
}

impl Callable {
    /// Wrap a uniform invoker
    pub fn new(signature: Signature, binding: Binding, invoker: Invoker) -> Self {
        Callable {
            invoker,
            signature,
            binding,
        }
    }

    /// Call with an ordered argument list
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        (self.invoker)(args)
    }

    /// Declared parameter and return types
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Instance binding
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// True for free functions
    pub fn is_static(&self) -> bool {
        self.binding == Binding::Static
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("signature", &self.signature)
            .field("binding", &self.binding)
            .finish()
    }
}

type DefaultKey = (String, TypeId);

/// Registry of callables and the composite types their arguments use.
#[derive(Default)]
pub struct Registry {
    callables: BTreeMap<String, Callable>,
    defaults: HashMap<DefaultKey, Arc<dyn Any + Send + Sync>>,
    types: TypeRegistry,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Store a uniform invoker under `path`, replacing any earlier entry.
    pub fn register(&mut self, path: &str, signature: Signature, invoker: Invoker) {
        self.insert(path, Callable::new(signature, Binding::Static, invoker));
    }

    /// Register a free function or closure.
    pub fn register_function<Args, F>(&mut self, path: &str, function: F)
    where
        F: Function<Args>,
    {
        let callable = Callable::new(F::signature(), Binding::Static, function.into_invoker());
        self.insert(path, callable);
    }

    /// Register a method bound to a host-supplied instance.
    pub fn register_method<T, M, F>(&mut self, path: &str, instance: &Handle<T>, method: F)
    where
        T: Send + 'static,
        F: Method<T, M>,
    {
        let callable = Callable::new(
            F::signature(),
            Binding::External,
            method.bind(Arc::clone(instance)),
        );
        self.insert(path, callable);
    }

    /// Register a method bound to a registry-owned default instance.
    ///
    /// The instance is created on the first registration for this owner
    /// path and type, then reused.
    pub fn register_method_default<T, M, F>(&mut self, path: &str, method: F)
    where
        T: Default + Send + 'static,
        F: Method<T, M>,
    {
        let instance = self.default_instance::<T>(owner_of(path));
        let callable = Callable::new(F::signature(), Binding::Owned, method.bind(instance));
        self.insert(path, callable);
    }

    /// Start binding methods of `T` under `class_path` against the
    /// registry-owned default instance.
    pub fn class<T>(&mut self, class_path: &str) -> ClassBuilder<'_, T>
    where
        T: Default + Send + 'static,
    {
        let instance = self.default_instance::<T>(class_path);
        ClassBuilder {
            registry: self,
            class_path: class_path.to_string(),
            instance,
            binding: Binding::Owned,
        }
    }

    /// Start binding methods of `T` under `class_path` against a
    /// host-supplied instance.
    pub fn class_with<T>(&mut self, class_path: &str, instance: &Handle<T>) -> ClassBuilder<'_, T>
    where
        T: Send + 'static,
    {
        ClassBuilder {
            registry: self,
            class_path: class_path.to_string(),
            instance: Arc::clone(instance),
            binding: Binding::External,
        }
    }

    fn default_instance<T>(&mut self, owner: &str) -> Handle<T>
    where
        T: Default + Send + 'static,
    {
        let key = (owner.to_string(), TypeId::of::<T>());
        if let Some(existing) = self.defaults.get(&key) {
            if let Ok(instance) = Arc::clone(existing).downcast::<parking_lot::Mutex<T>>() {
                return instance;
            }
        }
        let instance = handle(T::default());
        let shared: Arc<dyn Any + Send + Sync> = instance.clone();
        self.defaults.insert(key, shared);
        tracing::debug!(owner, type_name = std::any::type_name::<T>(), "created default instance");
        instance
    }

    fn insert(&mut self, path: &str, callable: Callable) {
        let binding = callable.binding;
        if self.callables.insert(path.to_string(), callable).is_some() {
            tracing::warn!(path, "replaced registered callable");
        } else {
            tracing::debug!(path, ?binding, "registered callable");
        }
    }

    /// Remove `path`. Owned instances no remaining path uses are dropped.
    /// Returns whether the path was registered.
    pub fn unregister(&mut self, path: &str) -> bool {
        if self.callables.remove(path).is_none() {
            return false;
        }
        let callables = &self.callables;
        self.defaults
            .retain(|(owner, _), _| callables.keys().any(|p| owner_of(p) == owner));
        true
    }

    // ========================================================================
    // Lookup and invocation
    // ========================================================================

    /// Invoke the callable at `path`.
    pub fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        let callable = self.get(path).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        tracing::debug!(path, args = args.len(), "invoking");
        callable.call(args)
    }

    /// Look up a callable
    pub fn get(&self, path: &str) -> Option<&Callable> {
        self.callables.get(path)
    }

    /// Check whether `path` is registered
    pub fn contains(&self, path: &str) -> bool {
        self.callables.contains_key(path)
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.callables.keys().map(String::as_str)
    }

    /// Registered paths with their callables, sorted by path
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Callable)> {
        self.callables.iter().map(|(path, c)| (path.as_str(), c))
    }

    /// Number of registered callables
    pub fn len(&self) -> usize {
        self.callables.len()
    }

    /// Check whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.callables.is_empty()
    }

    // ========================================================================
    // Composite types
    // ========================================================================

    /// Composite types known to the codec
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Mutable access for registering composite types
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Codec over this registry's composite types
    pub fn codec(&self) -> Codec<'_> {
        Codec::new(&self.types)
    }
}

/// Path with its last segment removed; empty for bare names.
fn owner_of(path: &str) -> &str {
    path.rsplit_once('.').map_or("", |(owner, _)| owner)
}

/// Binds methods of one class against one backing instance.
///
/// ```ignore
/// registry
///     .class::<User>("main.User")
///     .method("setId", User::set_id)
///     .method("getId", User::get_id);
/// ```
pub struct ClassBuilder<'r, T> {
    registry: &'r mut Registry,
    class_path: String,
    instance: Handle<T>,
    binding: Binding,
}

impl<T: Send + 'static> ClassBuilder<'_, T> {
    /// Register `method` as `<class_path>.<name>`
    pub fn method<M, F: Method<T, M>>(self, name: &str, method: F) -> Self {
        let path = format!("{}.{}", self.class_path, name);
        let callable = Callable::new(
            F::signature(),
            self.binding,
            method.bind(Arc::clone(&self.instance)),
        );
        self.registry.insert(&path, callable);
        self
    }

    /// The backing instance every method of this builder is bound to
    pub fn instance(&self) -> &Handle<T> {
        &self.instance
    }
}

//! callbox core - remote invocation of registered Rust callables
//!
//! Host programs register free functions and methods under dotted paths;
//! requests then name a path plus a JSON argument list and get a JSON result
//! back. This crate holds everything between the decoded request and the
//! encoded response:
//!
//! - [`value`]: the uniform [`Value`] every invoker consumes and produces
//! - [`convert`]: checked coercion between [`Value`] and Rust types
//! - [`codec`]: JSON ⇄ [`Value`], including explicit type tags
//! - [`types`]: composite types the codec can build from JSON
//! - [`adapter`]: typed callables → uniform invokers
//! - [`registry`]: path → callable map with backing instances
//! - [`resolver`]: `(package, class, method)` lookup and listing
//!
//! # Example
//!
//! ```ignore
//! use callbox_core::{Registry, Value};
//!
//! let mut registry = Registry::new();
//! registry.register_function("add", |a: i32, b: i32| a + b);
//!
//! let args = vec![Value::Long(1), Value::Long(2)];
//! assert_eq!(registry.invoke("add", args)?, Value::Int(3));
//! ```

#![warn(missing_docs)]

pub mod adapter;
pub mod codec;
pub mod convert;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod tag;
pub mod types;
pub mod value;

pub use adapter::{handle, Exclusive, Function, Handle, Invoker, Method, Shared, Signature};
pub use codec::Codec;
pub use convert::{FromValue, IntoValue, NativeType};
pub use error::{Error, Result, TypeMismatch};
pub use registry::{Binding, Callable, ClassBuilder, Registry};
pub use resolver::{Listing, Query};
pub use tag::ScalarKind;
pub use types::TypeRegistry;
pub use value::{Instance, Value};

//! callbox server - request facade for a callable registry
//!
//! Exposes a [`callbox_core::Registry`] over two JSON endpoints,
//! `POST /method/invoke` and `POST /method/list`, served by a blocking
//! single-threaded HTTP/1.1 loop.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use callbox_core::Registry;
//! use callbox_server::{Config, Server};
//!
//! let mut registry = Registry::new();
//! registry.register_function("add", |a: i32, b: i32| a + b);
//!
//! let config = Config::default();
//! let server = Server::bind(&config.server, Arc::new(registry))?;
//! server.serve()?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod http;
pub mod service;

pub use config::{Config, LogConfig, ServerConfig};
pub use error::{ConfigError, ServerError};
pub use http::{HttpRequest, HttpResponse, Server};
pub use service::Service;

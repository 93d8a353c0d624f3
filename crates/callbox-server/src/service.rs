//! JSON request service
//!
//! Turns decoded request bodies into response bodies. Every failure becomes
//! a `{"code": ..., "msg": ...}` payload; nothing escapes to the caller, so
//! one bad request never affects the next.
//!
//! ```text
//! invoke  {"package"?, "class"?, "method", "args" | "methodArgs"}
//!         → {"code": 200, "msg": "success", "type", "return", "methodArgs"}
//! list    {"package"?, "class"?, "method"?}
//!         → {"code": 200, "msg": "success", "packageTotal", ..., "packageList"}
//! ```

use std::sync::Arc;

use callbox_core::resolver::{self, Listing, Query};
use callbox_core::{Codec, Error, Registry, Value};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

/// Success envelope shared by both endpoints
#[derive(Serialize)]
struct Success<T> {
    code: u16,
    msg: &'static str,
    #[serde(flatten)]
    body: T,
}

impl<T> Success<T> {
    fn new(body: T) -> Self {
        Success {
            code: 200,
            msg: "success",
            body,
        }
    }
}

#[derive(Serialize)]
struct Invoked {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(rename = "return")]
    value: Json,
    #[serde(rename = "methodArgs")]
    method_args: Vec<Json>,
}

/// Error payload with a result code
pub fn failure(code: u16, msg: impl Into<String>) -> Json {
    json!({ "code": code, "msg": msg.into() })
}

/// Request service over a shared registry.
#[derive(Clone)]
pub struct Service {
    registry: Arc<Registry>,
}

impl Service {
    /// Serve requests against `registry`
    pub fn new(registry: Arc<Registry>) -> Self {
        Service { registry }
    }

    /// The registry requests run against
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle an invoke request body.
    pub fn invoke(&self, request: &Json) -> Json {
        match self.try_invoke(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "invoke failed");
                failure(500, e.to_string())
            }
        }
    }

    /// Handle a list request body.
    pub fn list(&self, request: &Json) -> Json {
        match self.try_list(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "list failed");
                failure(500, e.to_string())
            }
        }
    }

    fn try_invoke(&self, request: &Json) -> callbox_core::Result<Json> {
        let query = parse_query(request)?;
        let raw_args = match request.get("args").or_else(|| request.get("methodArgs")) {
            None | Some(Json::Null) => &[][..],
            Some(Json::Array(items)) => items.as_slice(),
            Some(_) => {
                return Err(Error::MalformedRequest("args must be an array".to_string()));
            }
        };

        let (path, callable) = resolver::resolve(&self.registry, &query)?;
        let codec = self.registry.codec();
        let args = raw_args
            .iter()
            .map(|arg| codec.decode(arg, None))
            .collect::<callbox_core::Result<Vec<_>>>()?;
        let method_args: Vec<Json> = args.iter().map(|arg| echo(&codec, arg)).collect();

        tracing::debug!(path = %path, args = args.len(), "invoking");
        let result = callable.call(args)?;
        let value = codec.encode(&result)?;

        to_json(Success::new(Invoked {
            type_name: result.type_name().into_owned(),
            value,
            method_args,
        }))
    }

    fn try_list(&self, request: &Json) -> callbox_core::Result<Json> {
        let filter = parse_query(request)?;
        let listing: Listing = resolver::list(&self.registry, &filter);
        to_json(Success::new(listing))
    }
}

fn parse_query(request: &Json) -> callbox_core::Result<Query> {
    Query::deserialize(request).map_err(|e| Error::MalformedRequest(e.to_string()))
}

fn to_json<T: Serialize>(body: T) -> callbox_core::Result<Json> {
    serde_json::to_value(body).map_err(|e| Error::UnsupportedValueType(e.to_string()))
}

/// Tagged echo of one argument. Arguments that cannot be encoded keep their
/// type label and lose their value.
fn echo(codec: &Codec<'_>, arg: &Value) -> Json {
    codec.encode_tagged(arg).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "argument echo degraded");
        json!({ "type": arg.type_name(), "value": Json::Null })
    })
}

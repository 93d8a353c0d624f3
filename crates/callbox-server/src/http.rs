//! Minimal HTTP/1.1 front end, built on std::net
//!
//! One connection carries one request. The transport status line is always
//! `200 OK`; the `code` field of the JSON body is the real result code.
//!
//! ```text
//! POST /method/invoke   → Service::invoke
//! POST /method/list     → Service::list
//! any other method      → {"code": 404}
//! any other path        → {"code": 404}
//! bad JSON / huge head  → {"code": 400}
//! huge body             → {"code": 400}
//! ```

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use callbox_core::Registry;
use serde_json::Value as Json;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::service::{failure, Service};

/// Invoke endpoint path
pub const INVOKE_PATH: &str = "/method/invoke";

/// List endpoint path
pub const LIST_PATH: &str = "/method/list";

/// Limit on request line plus headers
pub const MAX_HEAD_BYTES: u64 = 16 * 1024;

/// Parsed HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method, as sent
    pub method: String,
    /// Path without the query string
    pub path: String,
    /// Headers with lower-cased names
    pub headers: HashMap<String, String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Why a request could not be read
#[derive(Debug, Error)]
pub enum RequestError {
    /// Socket failure or timeout
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    /// Not an HTTP request
    #[error("malformed request: {0}")]
    Malformed(String),

    /// Request line and headers exceed [`MAX_HEAD_BYTES`]
    #[error("request head exceeds limit of {limit} bytes")]
    HeadTooLarge {
        /// Head limit in bytes
        limit: u64,
    },

    /// Declared body exceeds the configured limit
    #[error("request body of {length} bytes exceeds limit of {limit}")]
    BodyTooLarge {
        /// Declared Content-Length
        length: usize,
        /// Configured maximum
        limit: usize,
    },
}

/// Read one request: request line, headers, then a `Content-Length` body.
pub fn read_request<R: BufRead>(reader: &mut R, max_body: usize) -> Result<HttpRequest, RequestError> {
    let mut head = reader.by_ref().take(MAX_HEAD_BYTES);

    // Request line: METHOD /path?query HTTP/1.1
    let mut request_line = String::new();
    read_head_line(&mut head, &mut request_line)?;
    let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
    if parts.len() < 2 {
        return Err(RequestError::Malformed(format!(
            "invalid request line: {:?}",
            request_line.trim()
        )));
    }
    let method = parts[0].to_string();
    let path = match parts[1].split_once('?') {
        Some((path, _query)) => path.to_string(),
        None => parts[1].to_string(),
    };

    let mut headers = HashMap::new();
    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        if read_head_line(&mut head, &mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim().to_string();
            if key == "content-length" {
                content_length = value
                    .parse()
                    .map_err(|_| RequestError::Malformed(format!("bad content-length: {}", value)))?;
            }
            headers.insert(key, value);
        }
    }

    if content_length > max_body {
        return Err(RequestError::BodyTooLarge {
            length: content_length,
            limit: max_body,
        });
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}

/// One head line; running out of the head budget mid-line is an error.
fn read_head_line<R: BufRead>(head: &mut io::Take<R>, line: &mut String) -> Result<usize, RequestError> {
    let read = head.read_line(line)?;
    if head.limit() == 0 && !line.ends_with('\n') {
        return Err(RequestError::HeadTooLarge {
            limit: MAX_HEAD_BYTES,
        });
    }
    Ok(read)
}

/// Response body plus the origin to mirror in CORS headers
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// JSON body
    pub body: Json,
    /// Caller's `Origin` header, if any
    pub origin: Option<String>,
}

impl HttpResponse {
    /// Respond with `body`
    pub fn new(body: Json, origin: Option<String>) -> Self {
        HttpResponse { body, origin }
    }

    /// Serialize status line, headers and body.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let body = self.body.to_string();
        let mut head = format!("HTTP/1.1 200 {}\r\n", http_status_text(200));
        head.push_str("Content-Type: application/json\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        head.push_str(&format!(
            "Access-Control-Allow-Origin: {}\r\n",
            self.origin.as_deref().unwrap_or("*")
        ));
        head.push_str("Access-Control-Allow-Credentials: true\r\n");
        head.push_str("Access-Control-Allow-Headers: content-type\r\n");
        head.push_str("Access-Control-Allow-Methods: POST, OPTIONS\r\n");
        head.push_str("Connection: close\r\n\r\n");
        writer.write_all(head.as_bytes())?;
        writer.write_all(body.as_bytes())?;
        writer.flush()
    }
}

/// Dispatch a parsed request to the service.
pub fn route(service: &Service, request: &HttpRequest) -> Json {
    if request.method != "POST" {
        return failure(404, format!("unsupported method: {}", request.method));
    }
    if request.path != INVOKE_PATH && request.path != LIST_PATH {
        return failure(404, format!("not found: {}", request.path));
    }

    let body = if request.body.iter().all(u8::is_ascii_whitespace) {
        Json::Object(serde_json::Map::new())
    } else {
        match serde_json::from_slice::<Json>(&request.body) {
            Ok(body) => body,
            Err(e) => return failure(400, format!("malformed JSON body: {}", e)),
        }
    };

    if request.path == INVOKE_PATH {
        service.invoke(&body)
    } else {
        service.list(&body)
    }
}

fn http_status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

// ============================================================================
// Server
// ============================================================================

/// Blocking single-threaded server: one connection, one request, one
/// response, then the next connection.
pub struct Server {
    listener: TcpListener,
    service: Service,
    config: ServerConfig,
}

impl Server {
    /// Bind the configured address.
    pub fn bind(config: &ServerConfig, registry: Arc<Registry>) -> Result<Self, ServerError> {
        let addr = config.addr()?;
        let listener = TcpListener::bind(addr)?;
        tracing::info!(addr = %listener.local_addr()?, callables = registry.len(), "listening");
        Ok(Server {
            listener,
            service: Service::new(registry),
            config: config.clone(),
        })
    }

    /// Bound address (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// The service requests are dispatched to
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Serve connections until the process exits. Connection failures are
    /// logged and never stop the loop.
    pub fn serve(&self) -> Result<(), ServerError> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.handle_connection(stream) {
                        tracing::warn!(error = %e, "connection failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }
        Ok(())
    }

    /// Accept and serve exactly one connection.
    pub fn serve_one(&self) -> Result<(), ServerError> {
        let (stream, _) = self.listener.accept()?;
        self.handle_connection(stream)
    }

    fn handle_connection(&self, mut stream: TcpStream) -> Result<(), ServerError> {
        let peer = stream.peer_addr().ok();
        stream.set_read_timeout(self.config.read_timeout())?;
        let mut reader = BufReader::new(stream.try_clone()?);

        let (body, origin) = match read_request(&mut reader, self.config.max_body_bytes) {
            Ok(request) => {
                tracing::debug!(?peer, method = %request.method, path = %request.path, "request");
                let origin = request.header("origin").map(str::to_string);
                (route(&self.service, &request), origin)
            }
            Err(RequestError::Io(e)) => return Err(e.into()),
            Err(RequestError::BodyTooLarge { length, limit }) => {
                // Drain the body so the client sees the response instead of a reset.
                io::copy(&mut reader.by_ref().take(length as u64), &mut io::sink())?;
                let msg = RequestError::BodyTooLarge { length, limit }.to_string();
                tracing::warn!(?peer, length, limit, "request body too large");
                (failure(400, msg), None)
            }
            Err(e @ (RequestError::Malformed(_) | RequestError::HeadTooLarge { .. })) => {
                tracing::warn!(?peer, error = %e, "malformed request");
                (failure(400, e.to_string()), None)
            }
        };

        HttpResponse::new(body, origin).write_to(&mut stream)?;
        Ok(())
    }
}

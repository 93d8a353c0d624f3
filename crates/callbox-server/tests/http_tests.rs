//! HTTP round trips over a real loopback socket.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use callbox_core::Registry;
use callbox_server::{Config, Server, ServerConfig};
use serde_json::{json, Value as Json};

fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.register_function("add", |a: i32, b: i32| a + b);
    Arc::new(registry)
}

fn test_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        max_body_bytes: 256,
        ..ServerConfig::default()
    }
}

/// Serve one connection on a background thread and send `raw` to it.
fn exchange(config: &ServerConfig, raw: &[u8]) -> (String, Json) {
    let server = Server::bind(config, registry()).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = thread::spawn(move || server.serve_one());

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(raw).unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    handle.join().unwrap().unwrap();

    let (head, body) = response.split_once("\r\n\r\n").unwrap();
    (head.to_string(), serde_json::from_str(body).unwrap())
}

fn post(path: &str, body: &str) -> Vec<u8> {
    format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nOrigin: http://tester\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body
    )
    .into_bytes()
}

// ────────────────────────────────────────────────────────────────────────────
// Endpoints
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_invoke_over_http() {
    let (head, body) = exchange(
        &test_config(),
        &post("/method/invoke", r#"{"method":"add","args":[1,2]}"#),
    );
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains("Content-Type: application/json"));
    assert!(head.contains("Access-Control-Allow-Origin: http://tester"));
    assert_eq!(body["code"], 200);
    assert_eq!(body["return"], 3);
}

#[test]
fn test_list_over_http() {
    let (_, body) = exchange(&test_config(), &post("/method/list", "{}"));
    assert_eq!(body["methodTotal"], 1);
    assert_eq!(body["packageList"][0]["classList"][0]["methodList"][0]["name"], "add");
}

// ────────────────────────────────────────────────────────────────────────────
// Rejections still answer 200 with a JSON code
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_preflight_gets_404_code() {
    let raw = b"OPTIONS /method/invoke HTTP/1.1\r\nOrigin: http://tester\r\n\r\n";
    let (head, body) = exchange(&test_config(), raw);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains("Access-Control-Allow-Methods: POST, OPTIONS"));
    assert_eq!(body["code"], 404);
}

#[test]
fn test_unknown_path_gets_404_code() {
    let (_, body) = exchange(&test_config(), &post("/nope", "{}"));
    assert_eq!(body["code"], 404);
}

#[test]
fn test_malformed_json_gets_400_code() {
    let (_, body) = exchange(&test_config(), &post("/method/invoke", "{\"method\":"));
    assert_eq!(body["code"], 400);
}

#[test]
fn test_oversized_body_gets_400_code() {
    let big = format!(r#"{{"method":"add","args":[1,2],"pad":"{}"}}"#, "x".repeat(512));
    let (head, body) = exchange(&test_config(), &post("/method/invoke", &big));
    assert!(head.contains("Access-Control-Allow-Origin: *"));
    assert_eq!(body["code"], 400);
    assert!(body["msg"].as_str().unwrap().contains("exceeds limit"));
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_file_drives_bind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("callbox.toml");
    std::fs::write(
        &path,
        "[server]\nhost = \"127.0.0.1\"\nport = 0\nmax_body_bytes = 128\n\n[log]\nfilter = \"debug\"\n",
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.log.filter, "debug");
    assert_eq!(config.server.max_body_bytes, 128);

    let (_, body) = exchange(&config.server, &post("/method/invoke", r#"{"method":"add","args":[20,22]}"#));
    assert_eq!(body["return"], 42);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, callbox_server::ConfigError::Io(_)));
}

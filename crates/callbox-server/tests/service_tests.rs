//! End-to-end request scenarios against the JSON service.

use std::sync::Arc;

use callbox_core::Registry;
use callbox_server::Service;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
}

callbox_core::composite!(User, "pkg.User");

impl User {
    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn get_id(&self) -> i64 {
        self.id
    }
}

fn service() -> Service {
    let mut registry = Registry::new();
    registry.types_mut().register::<User>("pkg.User");
    registry.register_function("add", |a: i32, b: i32| a + b);
    registry.register_function("pkg.newUser", |id: i64, name: String| User { id, name });
    registry.register_function("divide", |a: i32, b: i32| a / b);
    registry
        .class::<User>("pkg.User")
        .method("setId", User::set_id)
        .method("getId", User::get_id);
    Service::new(Arc::new(registry))
}

// ────────────────────────────────────────────────────────────────────────────
// Invoke
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_add() {
    let response = service().invoke(&json!({"method": "add", "args": [1, 2]}));
    assert_eq!(response["code"], 200);
    assert_eq!(response["msg"], "success");
    assert_eq!(response["return"], 3);
}

#[test]
fn test_missing_method_names_path() {
    let response = service().invoke(&json!({"method": "missing", "args": []}));
    assert_eq!(response["code"], 500);
    assert!(response["msg"].as_str().unwrap().contains("missing"));
}

#[test]
fn test_failures_do_not_poison_later_requests() {
    let service = service();
    let response = service.invoke(&json!({"method": "divide", "args": [1, 0]}));
    assert_eq!(response["code"], 500);
    assert!(response["msg"].as_str().unwrap().contains("panicked"));

    let response = service.invoke(&json!({"method": "add", "args": [1]}));
    assert_eq!(response["code"], 500);
    assert!(response["msg"].as_str().unwrap().contains("expected 2, got 1"));

    let response = service.invoke(&json!({"method": "divide", "args": [9, 3]}));
    assert_eq!(response["return"], 3);
}

#[test]
fn test_class_path_shares_instance() {
    let service = service();
    let response = service.invoke(&json!({
        "package": "pkg",
        "class": "User",
        "method": "setId",
        "args": ["long:41"],
    }));
    assert_eq!(response["code"], 200);
    assert_eq!(response["type"], "void");
    assert_eq!(response["return"], json!(null));

    let response = service.invoke(&json!({"package": "pkg", "class": "User", "method": "getId"}));
    assert_eq!(response["return"], 41);
    assert_eq!(response["type"], "long");
}

#[test]
fn test_composite_result_and_args() {
    let response = service().invoke(&json!({"package": "pkg", "method": "newUser", "args": [7, "Ada"]}));
    assert_eq!(response["code"], 200);
    assert_eq!(response["type"], "pkg.User");
    assert_eq!(response["return"], json!({"id": 7, "name": "Ada"}));
    assert_eq!(
        response["methodArgs"],
        json!([{"type": "long", "value": 7}, {"type": "string", "value": "Ada"}])
    );
}

#[test]
fn test_bare_fraction_is_echoed_as_float() {
    let mut registry = Registry::new();
    registry.register_function("half", |x: f64| x / 2.0);
    let service = Service::new(Arc::new(registry));
    let response = service.invoke(&json!({"method": "half", "args": [5.6]}));
    assert_eq!(response["code"], 200);
    assert_eq!(response["type"], "double");
    assert_eq!(response["methodArgs"][0]["type"], "float");
}

#[test]
fn test_slash_package_is_normalized() {
    let mut registry = Registry::new();
    registry.register_function("demo.util.twice", |x: i64| x * 2);
    let service = Service::new(Arc::new(registry));
    let response = service.invoke(&json!({"package": "demo/util", "method": "twice", "args": [4]}));
    assert_eq!(response["return"], 8);
}

// ────────────────────────────────────────────────────────────────────────────
// List
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_list_by_class() {
    let response = service().list(&json!({"class": "User"}));
    assert_eq!(response["code"], 200);
    assert_eq!(response["packageTotal"], 1);
    assert_eq!(response["classTotal"], 1);
    assert_eq!(response["methodTotal"], 2);

    let package = &response["packageList"][0];
    assert_eq!(package["package"], "pkg");
    assert_eq!(package["classTotal"], 1);
    let class = &package["classList"][0];
    assert_eq!(class["class"], "User");
    assert_eq!(class["methodTotal"], 2);
    assert_eq!(
        class["methodList"],
        json!([
            {
                "name": "getId",
                "returnType": "long",
                "genericReturnType": "long",
                "parameterTypeList": [],
                "static": false,
            },
            {
                "name": "setId",
                "returnType": "void",
                "genericReturnType": "void",
                "parameterTypeList": ["long"],
                "static": false,
            },
        ])
    );
}

#[test]
fn test_list_everything() {
    let response = service().list(&json!({}));
    // "" (add, divide) and "pkg" (newUser, User.*)
    assert_eq!(response["packageTotal"], 2);
    assert_eq!(response["classTotal"], 3);
    assert_eq!(response["methodTotal"], 5);
}

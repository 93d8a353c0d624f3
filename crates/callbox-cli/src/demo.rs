//! Demo registrations
//!
//! The host-program side: a handful of free functions, three classes and
//! the composite types their arguments and results use.

use std::time::{SystemTime, UNIX_EPOCH};

use callbox_core::{handle, Registry};
use serde::{Deserialize, Serialize};

// ============================================================================
// Free functions
// ============================================================================

fn add(a: i32, b: i32) -> i32 {
    a + b
}

fn divide(a: f64, b: f64) -> f64 {
    a / b
}

fn print(message: String) {
    println!("{}", message);
}

fn new_moment(id: i64) -> Moment {
    let mut moment = Moment::default();
    moment.set_id(id);
    moment
}

fn new_user(id: i64, name: String) -> User {
    User {
        id,
        name,
        ..User::default()
    }
}

fn compare(u: User, u2: User) -> i32 {
    match u.id.cmp(&u2.id) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

fn contains(items: Vec<i64>, item: i64) -> bool {
    items.contains(&item)
}

fn index_of(items: Vec<String>, item: String) -> i32 {
    items
        .iter()
        .position(|s| *s == item)
        .and_then(|i| i32::try_from(i).ok())
        .unwrap_or(-1)
}

// ============================================================================
// Classes
// ============================================================================

/// Demo user record
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Identifier
    pub id: i64,
    /// 0 for male
    pub sex: i32,
    /// Display name
    pub name: String,
    /// Creation time, unix seconds
    pub date: i64,
}

callbox_core::composite!(User, "main.User");

impl User {
    fn get_id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn get_name(&self) -> String {
        self.name.clone()
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn get_date(&self) -> i64 {
        self.date
    }

    fn set_date(&mut self, date: i64) {
        self.date = date;
    }

    fn is_male(&self) -> bool {
        self.sex == 0
    }
}

/// Demo post
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Moment {
    /// Identifier
    pub id: i64,
    /// Author id
    pub user_id: i64,
    /// Body text
    pub content: String,
}

callbox_core::composite!(Moment, "main.Moment");

impl Moment {
    fn set_id(&mut self, id: i64) {
        tracing::info!(id, "moment setId");
        self.id = id;
    }

    fn get_id(&self) -> i64 {
        self.id
    }

    fn set_user_id(&mut self, user_id: i64) {
        self.user_id = user_id;
    }

    fn get_user_id(&self) -> i64 {
        self.user_id
    }

    fn set_content(&mut self, content: String) {
        tracing::info!(%content, "moment setContent");
        self.content = content;
    }

    fn get_content(&self) -> String {
        self.content.clone()
    }
}

/// Composite type used only as an argument/result shape
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    /// Name
    pub name: String,
    /// Age in years
    pub age: i32,
}

callbox_core::composite!(Person);

#[derive(Debug, Default)]
struct TestUtil;

impl TestUtil {
    /// Integer division, widened afterwards
    fn divide(&self, a: i32, b: i32) -> f64 {
        f64::from(a / b)
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Build the demo registry.
pub fn registry() -> Registry {
    let mut registry = Registry::new();

    let types = registry.types_mut();
    types.register::<User>("main.User");
    types.register::<Moment>("main.Moment");
    types.register::<Person>("Person");

    registry.register_function("add", add);
    registry.register_function("divide", divide);
    registry.register_function("print", print);
    registry.register_function("main.newMoment", new_moment);
    registry.register_function("main.newUser", new_user);
    registry.register_function("main.compare", compare);
    registry.register_function("demo.util.divide", divide);
    registry.register_function("demo.util.contains", contains);
    registry.register_function("demo.util.indexOf", index_of);

    let user = handle(User {
        id: 1,
        name: "Test User".to_string(),
        date: unix_now(),
        ..User::default()
    });
    registry
        .class_with("main.User", &user)
        .method("getId", User::get_id)
        .method("setId", User::set_id)
        .method("getName", User::get_name)
        .method("setName", User::set_name)
        .method("getDate", User::get_date)
        .method("setDate", User::set_date)
        .method("isMale", User::is_male);

    registry
        .class::<Moment>("main.Moment")
        .method("getId", Moment::get_id)
        .method("setId", Moment::set_id)
        .method("getUserId", Moment::get_user_id)
        .method("setUserId", Moment::set_user_id)
        .method("getContent", Moment::get_content)
        .method("setContent", Moment::set_content);

    registry
        .class::<TestUtil>("demo.util.TestUtil")
        .method("divide", TestUtil::divide);

    tracing::debug!(callables = registry.len(), types = registry.types().len(), "demo registry ready");
    registry
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use callbox_core::resolver::{self, Query};
    use callbox_core::{Error, Value};
    use serde_json::json;

    fn decode(registry: &Registry, args: serde_json::Value) -> Vec<Value> {
        let codec = registry.codec();
        args.as_array()
            .unwrap()
            .iter()
            .map(|a| codec.decode(a, None).unwrap())
            .collect()
    }

    #[test]
    fn test_divide() {
        let registry = registry();
        let args = decode(&registry, json!([5.6, 2]));
        match registry.invoke("divide", args).unwrap() {
            // 5.6 arrives as a float, so only f32 precision survives
            Value::Double(d) => assert!((d - 2.8).abs() < 1e-6),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_moment_encodes_camel_case() {
        let registry = registry();
        let moment = registry.invoke("main.newMoment", vec![Value::Long(12)]).unwrap();
        assert_eq!(moment.type_name(), "main.Moment");
        assert_eq!(
            registry.codec().encode(&moment).unwrap(),
            json!({"id": 12, "userId": 0, "content": ""})
        );
    }

    #[test]
    fn test_compare_users_from_json() {
        let registry = registry();
        let args = decode(
            &registry,
            json!([
                {"type": "main.User", "value": {"id": 1}},
                {"type": "main.User", "value": {"id": 2}},
            ]),
        );
        assert_eq!(registry.invoke("main.compare", args).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_sequence_helpers() {
        let registry = registry();
        let args = decode(&registry, json!([{"type": "long[]", "value": [1, 2, 3]}, 2]));
        assert_eq!(registry.invoke("demo.util.contains", args).unwrap(), Value::Bool(true));

        let args = decode(&registry, json!([["a", "b"], "c"]));
        assert_eq!(registry.invoke("demo.util.indexOf", args).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_seeded_user_is_shared() {
        let registry = registry();
        assert_eq!(registry.invoke("main.User.getId", vec![]).unwrap(), Value::Long(1));
        registry.invoke("main.User.setId", vec![Value::Long(225)]).unwrap();
        assert_eq!(registry.invoke("main.User.getId", vec![]).unwrap(), Value::Long(225));
        assert_eq!(registry.invoke("main.User.isMale", vec![]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_test_util_divide_by_zero_is_caught() {
        let registry = registry();
        let args = vec![Value::Long(1), Value::Long(0)];
        assert!(matches!(
            registry.invoke("demo.util.TestUtil.divide", args),
            Err(Error::Panic(_))
        ));
    }

    #[test]
    fn test_listing_groups_demo_classes() {
        let registry = registry();
        let listing = resolver::list(&registry, &Query::new("demo/util", "", ""));
        assert_eq!(listing.package_total, 1);
        // free functions plus TestUtil
        assert_eq!(listing.class_total, 2);
        assert_eq!(listing.method_total, 4);
    }
}

//! Path resolution and listing
//!
//! A request names its target as a `(package, class, method)` triple. The
//! resolver joins the non-empty parts with `.` and falls back to the bare
//! method name when the full path is not registered.
//!
//! Listing runs the other way: every registered path is split back into
//! package, class and method, then grouped into a package → class → method
//! tree. The split relies on naming convention. The last segment is the
//! method, the right-most segment left of it that starts with an upper-case
//! letter is the class, and everything else is package. Paths that do not
//! follow the convention (lower-case classes, capitalized package segments)
//! are grouped wrongly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::{Callable, Registry};

/// A `(package, class, method)` triple, used both to resolve one callable
/// and as a listing filter. Empty or missing parts impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Package, `.` or `/` separated
    pub package: Option<String>,
    /// Class name
    pub class: Option<String>,
    /// Method name
    pub method: Option<String>,
}

impl Query {
    /// Query for a method with optional package and class
    pub fn new(package: &str, class: &str, method: &str) -> Self {
        let part = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Query {
            package: part(package),
            class: part(class),
            method: part(method),
        }
    }

    /// Package with `/` separators normalized to `.`
    pub fn package(&self) -> String {
        self.package.as_deref().unwrap_or("").trim().replace('/', ".")
    }

    /// Class name, empty when absent
    pub fn class(&self) -> &str {
        self.class.as_deref().unwrap_or("").trim()
    }

    /// Method name, empty when absent
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("").trim()
    }
}

/// Candidate paths for `query`, most specific first.
pub fn candidates(query: &Query) -> Vec<String> {
    let package = query.package();
    let full = [package.as_str(), query.class(), query.method()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".");
    let mut paths = vec![full];
    if paths[0] != query.method() {
        paths.push(query.method().to_string());
    }
    paths
}

/// Find the callable `query` names.
///
/// Fails with `MalformedRequest` when no method is given and with
/// `NotFound` naming the full path when neither candidate is registered.
pub fn resolve<'r>(registry: &'r Registry, query: &Query) -> Result<(String, &'r Callable)> {
    if query.method().is_empty() {
        return Err(Error::MalformedRequest("method is required".to_string()));
    }
    let mut paths = candidates(query);
    for path in &paths {
        if let Some(callable) = registry.get(path) {
            return Ok((path.clone(), callable));
        }
    }
    Err(Error::NotFound {
        path: paths.swap_remove(0),
    })
}

/// Package, class and method derived from a registered path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segments {
    /// Dot-joined package segments, empty for none
    pub package: String,
    /// Class segment, empty for none
    pub class: String,
    /// Method segment
    pub method: String,
}

/// Split a registered path into package, class and method.
pub fn split_path(path: &str) -> Segments {
    let mut parts: Vec<&str> = path.split('.').collect();
    let method = parts.pop().unwrap_or_default().to_string();
    let class_at = parts
        .iter()
        .rposition(|part| part.chars().next().is_some_and(char::is_uppercase));
    let class = match class_at {
        Some(index) => parts.remove(index).to_string(),
        None => String::new(),
    };
    Segments {
        package: parts.join("."),
        class,
        method,
    }
}

// ============================================================================
// Listing
// ============================================================================

/// One listed method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
    /// Method name
    pub name: String,
    /// Return type label
    pub return_type: String,
    /// Return type label including element types
    pub generic_return_type: String,
    /// Parameter type labels
    pub parameter_type_list: Vec<String>,
    /// True for free functions
    #[serde(rename = "static")]
    pub is_static: bool,
}

/// One listed class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    /// Class name, empty for free functions
    pub class: String,
    /// Number of methods
    pub method_total: usize,
    /// Methods, sorted by name
    pub method_list: Vec<MethodEntry>,
}

/// One listed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    /// Package name, empty for top-level paths
    pub package: String,
    /// Number of classes
    pub class_total: usize,
    /// Classes, sorted by name
    pub class_list: Vec<ClassEntry>,
}

/// Package → class → method tree with totals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Number of packages
    pub package_total: usize,
    /// Number of classes across all packages
    pub class_total: usize,
    /// Number of methods across all classes
    pub method_total: usize,
    /// Packages, sorted by name
    pub package_list: Vec<PackageEntry>,
}

/// List every registered callable matching `filter`.
pub fn list(registry: &Registry, filter: &Query) -> Listing {
    let want_package = filter.package();
    let mut tree: BTreeMap<String, BTreeMap<String, Vec<MethodEntry>>> = BTreeMap::new();

    for (path, callable) in registry.iter() {
        let segments = split_path(path);
        let keep = [
            (want_package.as_str(), segments.package.as_str()),
            (filter.class(), segments.class.as_str()),
            (filter.method(), segments.method.as_str()),
        ]
        .iter()
        .all(|(wanted, actual)| wanted.is_empty() || wanted == actual);
        if !keep {
            continue;
        }

        let signature = callable.signature();
        tree.entry(segments.package)
            .or_default()
            .entry(segments.class)
            .or_default()
            .push(MethodEntry {
                name: segments.method,
                return_type: base_type(&signature.ret).to_string(),
                generic_return_type: signature.ret.clone(),
                parameter_type_list: signature.params.clone(),
                is_static: callable.is_static(),
            });
    }

    let mut listing = Listing {
        package_total: tree.len(),
        ..Listing::default()
    };
    for (package, class_map) in tree {
        let mut class_list = Vec::with_capacity(class_map.len());
        for (class, mut methods) in class_map {
            methods.sort_by(|a, b| a.name.cmp(&b.name));
            listing.method_total += methods.len();
            class_list.push(ClassEntry {
                class,
                method_total: methods.len(),
                method_list: methods,
            });
        }
        listing.class_total += class_list.len();
        listing.package_list.push(PackageEntry {
            package,
            class_total: class_list.len(),
            class_list,
        });
    }
    listing
}

/// Outer type of a label: `map<string, long>` → `map`, `int[]` → `int[]`.
fn base_type(label: &str) -> &str {
    label.split('<').next().unwrap_or(label).trim()
}

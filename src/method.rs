//! Method maps: endpoint name to callable.
//!
//! A [`Method`] receives the assembled [`Client`] it is called on (the
//! receiver) and the call arguments. Endpoint methods never talk to the
//! transport directly; they go through [`Client::api_call`], which resolves
//! `api_call` in the client's *final* method map. That is what lets a
//! transform on `api_call` affect every endpoint at once.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;
use crate::client::Client;

/// A callable endpoint method.
pub type Method = Arc<dyn Fn(&Client, CallArgs) -> Result<Value> + Send + Sync>;

/// Wrap a closure as a [`Method`].
pub fn method<F>(f: F) -> Method
where
    F: Fn(&Client, CallArgs) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Arguments of a single call.
///
/// Keyword arguments live in a `BTreeMap`, so they are always sorted and two
/// argument sets with the same content serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallArgs {
    /// Positional arguments
    pub positional: Vec<Value>,
    /// Keyword arguments
    pub keyword: BTreeMap<String, Value>,
}

impl CallArgs {
    /// Empty argument set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword argument
    #[must_use]
    pub fn kw(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Append a positional argument
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Look up a keyword argument
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keyword.get(key)
    }

    /// Remove a keyword argument
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.keyword.remove(key)
    }

    /// Set a keyword argument, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.keyword.insert(key.into(), value.into());
    }

    /// `true` when there are neither positional nor keyword arguments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Canonical JSON form: positional order kept, keywords sorted.
    #[must_use]
    pub fn canonical(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Keyword arguments as a JSON object
    #[must_use]
    pub fn keyword_object(&self) -> Map<String, Value> {
        self.keyword
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for CallArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            keyword: map.into_iter().collect(),
        }
    }
}

/// Endpoint name to [`Method`].
#[derive(Clone, Default)]
pub struct MethodMap {
    methods: HashMap<String, Method>,
}

impl MethodMap {
    /// Empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a method, returning the one it replaced
    pub fn insert(&mut self, name: impl Into<String>, method: Method) -> Option<Method> {
        self.methods.insert(name.into(), method)
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, method: Method) -> Self {
        self.insert(name, method);
        self
    }

    /// Look up a method
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Remove a method
    pub fn remove(&mut self, name: &str) -> Option<Method> {
        self.methods.remove(name)
    }

    /// Whether a method with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of methods
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Method names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Merge `other` into this map; entries of `other` win on collision.
    pub fn merge(&mut self, other: MethodMap) {
        self.methods.extend(other.methods);
    }
}

impl fmt::Debug for MethodMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMap")
            .field("methods", &self.names())
            .finish()
    }
}

impl FromIterator<(String, Method)> for MethodMap {
    fn from_iter<I: IntoIterator<Item = (String, Method)>>(iter: I) -> Self {
        Self {
            methods: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MethodMap {
    type Item = (String, Method);
    type IntoIter = std::collections::hash_map::IntoIter<String, Method>;

    fn into_iter(self) -> Self::IntoIter {
        self.methods.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(v: Value) -> Method {
        method(move |_, _| Ok(v.clone()))
    }

    #[test]
    fn canonical_form_ignores_keyword_insertion_order() {
        let a = CallArgs::new().kw("channel", "C1").kw("oldest", "0");
        let b = CallArgs::new().kw("oldest", "0").kw("channel", "C1");
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn canonical_form_keeps_positional_order() {
        let a = CallArgs::new().arg(1).arg(2);
        let b = CallArgs::new().arg(2).arg(1);
        assert_ne!(a.canonical(), b.canonical());
    }

    #[test]
    fn canonical_form_distinguishes_positional_from_keyword() {
        let a = CallArgs::new().arg("C1");
        let b = CallArgs::new().kw("channel", "C1");
        assert_ne!(a.canonical(), b.canonical());
    }

    #[test]
    fn names_are_sorted() {
        let map = MethodMap::new()
            .with("users_list", constant(json!(1)))
            .with("api_call", constant(json!(2)))
            .with("chat_postMessage", constant(json!(3)));
        assert_eq!(map.names(), vec!["api_call", "chat_postMessage", "users_list"]);
    }

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut base = MethodMap::new()
            .with("a", constant(json!("base")))
            .with("b", constant(json!("base")));
        let extra = MethodMap::new().with("b", constant(json!("extra")));
        base.merge(extra);

        assert_eq!(base.len(), 2);
        assert!(base.contains("a"));
    }

    #[test]
    fn from_json_object() {
        let args = CallArgs::from(json!({"channel": "C1", "limit": 5}).as_object().cloned().unwrap());
        assert_eq!(args.get("channel"), Some(&json!("C1")));
        assert!(args.positional.is_empty());
    }
}

//! Base method extraction.
//!
//! A client type is described as an ordered stack of [`ClientLayer`]s,
//! least-derived first, the way a class hierarchy would be. Each layer
//! contributes named members; a more-derived layer shadows earlier ones.
//! [`collect_base_methods`] resolves the stack and keeps only the methods.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;

use crate::method::{Method, MethodMap};

/// A member contributed by a layer
#[derive(Clone)]
pub enum Member {
    /// Callable method
    Method(Method),
    /// Plain data attribute (never part of a method map)
    Attribute(Value),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method(..)"),
            Self::Attribute(v) => f.debug_tuple("Attribute").field(v).finish(),
        }
    }
}

/// One level of a client type
#[derive(Debug, Clone)]
pub struct ClientLayer {
    name: String,
    members: Vec<(String, Member)>,
}

impl ClientLayer {
    /// Empty layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Add a method
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.members.push((name.into(), Member::Method(method)));
        self
    }

    /// Add a data attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members
            .push((name.into(), Member::Attribute(value.into())));
        self
    }

    /// Layer name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order
    #[must_use]
    pub fn members(&self) -> &[(String, Member)] {
        &self.members
    }
}

/// A client type: layers ordered least-derived first
#[derive(Debug, Clone)]
pub struct ClientType {
    name: String,
    layers: Vec<ClientLayer>,
}

impl ClientType {
    /// Type with no layers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
        }
    }

    /// Derive from this type by stacking a more-derived layer on top
    #[must_use]
    pub fn extend(mut self, layer: ClientLayer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Type name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layers, least-derived first
    #[must_use]
    pub fn layers(&self) -> &[ClientLayer] {
        &self.layers
    }

    /// Resolve every member name to its most-derived definition
    fn resolve(&self) -> HashMap<&str, &Member> {
        let mut resolved = HashMap::new();
        for layer in &self.layers {
            for (name, member) in &layer.members {
                resolved.insert(name.as_str(), member);
            }
        }
        resolved
    }

    /// Resolved data attributes
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        self.resolve()
            .into_iter()
            .filter_map(|(name, member)| match member {
                Member::Attribute(v) => Some((name.to_string(), v.clone())),
                Member::Method(_) => None,
            })
            .collect()
    }
}

/// Collect every method of `client_type`, most-derived definition winning.
///
/// Attributes are skipped, including an attribute that shadows an inherited
/// method of the same name. An empty type yields an empty map.
#[must_use]
pub fn collect_base_methods(client_type: &ClientType) -> MethodMap {
    client_type
        .resolve()
        .into_iter()
        .filter_map(|(name, member)| match member {
            Member::Method(m) => Some((name.to_string(), m.clone())),
            Member::Attribute(_) => None,
        })
        .collect()
}

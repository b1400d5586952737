//! `TransformPipeline`: resolves features and folds them over a method map.
//!
//! # Execution Model
//!
//! 1. Every requested feature is resolved first. A name missing from the
//!    registry fails the whole build before any transform runs.
//! 2. Transforms are applied strictly in the requested order, each one
//!    consuming the previous output.
//! 3. An empty request applies every registered feature in declaration
//!    order.

use std::sync::Arc;

use tracing::debug;

use super::{Feature, FeatureRegistry, Transform};
use crate::method::MethodMap;
use crate::{Error, Result};

/// Result of a pipeline run
#[derive(Debug)]
pub struct Applied {
    /// Final method map
    pub methods: MethodMap,
    /// Names of the features applied, in order
    pub features: Vec<String>,
}

/// Folds features over method maps using a shared registry.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    registry: Arc<FeatureRegistry>,
}

impl TransformPipeline {
    /// Pipeline resolving names against `registry`
    #[must_use]
    pub fn new(registry: Arc<FeatureRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve one feature to its transform
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFeature` for names not in the registry.
    pub fn resolve(&self, feature: &Feature) -> Result<Arc<dyn Transform>> {
        match feature {
            Feature::Custom { transform, .. } => Ok(Arc::clone(transform)),
            Feature::Named(name) => self
                .registry
                .get(name)
                .ok_or_else(|| Error::UnknownFeature(name.clone())),
        }
    }

    /// Apply `features` to `base` in order (all registered features if empty)
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFeature` before touching `base` if any name is
    /// unknown, or the first error a transform reports.
    pub fn apply(&self, base: MethodMap, features: &[Feature]) -> Result<Applied> {
        let resolved: Vec<(String, Arc<dyn Transform>)> = if features.is_empty() {
            self.registry
                .iter()
                .map(|(name, t)| (name.to_string(), Arc::clone(t)))
                .collect()
        } else {
            features
                .iter()
                .map(|f| Ok((f.name().to_string(), self.resolve(f)?)))
                .collect::<Result<_>>()?
        };

        let mut methods = base;
        let mut applied = Vec::with_capacity(resolved.len());
        for (name, transform) in resolved {
            methods = transform.apply(methods)?;
            debug!(feature = %name, methods = methods.len(), "Applied feature");
            applied.push(name);
        }

        Ok(Applied {
            methods,
            features: applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{CallArgs, Method, method};
    use crate::client::BaseClient;
    use crate::factory::ClientFactory;
    use crate::registry::ClientType;
    use crate::transport::ScriptedTransport;
    use serde_json::{Value, json};

    fn constant(v: Value) -> Method {
        method(move |_, _| Ok(v.clone()))
    }

    /// Appends a tag to the `trail` method's output.
    fn tagger(tag: &'static str) -> impl Transform + 'static {
        move |mut methods: MethodMap| -> Result<MethodMap> {
            let Some(inner) = methods.remove("trail") else {
                return Ok(methods);
            };
            methods.insert(
                "trail",
                method(move |client, args| {
                    let mut out = inner(client, args)?;
                    if let Value::Array(items) = &mut out {
                        items.push(json!(tag));
                    }
                    Ok(out)
                }),
            );
            Ok(methods)
        }
    }

    fn registry() -> Arc<FeatureRegistry> {
        Arc::new(
            FeatureRegistry::builder()
                .register("a", tagger("a"))
                .unwrap()
                .register("b", tagger("b"))
                .unwrap()
                .build(),
        )
    }

    fn base() -> MethodMap {
        MethodMap::new()
            .with("trail", constant(json!([])))
            .with("other", constant(json!("untouched")))
    }

    fn run(applied: Applied) -> Value {
        let class = ClientFactory::new(ClientType::new("T"), Arc::new(FeatureRegistry::empty()))
            .build(&[], applied.methods)
            .unwrap();
        class
            .instantiate(BaseClient::new(Arc::new(ScriptedTransport::new())))
            .call("trail", CallArgs::new())
            .unwrap()
    }

    #[test]
    fn empty_request_applies_all_in_declared_order() {
        let pipeline = TransformPipeline::new(registry());
        let applied = pipeline.apply(base(), &[]).unwrap();

        assert_eq!(applied.features, vec!["a", "b"]);
        assert_eq!(run(applied), json!(["a", "b"]));
    }

    #[test]
    fn explicit_order_is_respected() {
        let pipeline = TransformPipeline::new(registry());
        let applied = pipeline.apply(base(), &["b".into(), "a".into()]).unwrap();

        assert_eq!(applied.features, vec!["b", "a"]);
        assert_eq!(run(applied), json!(["b", "a"]));
    }

    #[test]
    fn custom_transform_bypasses_registry() {
        let pipeline = TransformPipeline::new(Arc::new(FeatureRegistry::empty()));
        let applied = pipeline
            .apply(base(), &[Feature::custom("mine", tagger("mine"))])
            .unwrap();

        assert_eq!(applied.features, vec!["mine"]);
        assert_eq!(run(applied), json!(["mine"]));
    }

    #[test]
    fn unknown_feature_fails_before_any_transform() {
        let pipeline = TransformPipeline::new(registry());
        let err = pipeline
            .apply(base(), &["a".into(), "not_a_feature".into()])
            .unwrap_err();

        assert!(matches!(err, Error::UnknownFeature(name) if name == "not_a_feature"));
    }

    #[test]
    fn unrelated_keys_survive() {
        let pipeline = TransformPipeline::new(registry());
        let applied = pipeline.apply(base(), &[]).unwrap();
        assert_eq!(applied.methods.names(), vec!["other", "trail"]);
    }
}

//! Client assembly.
//!
//! [`ClientFactory::build`] collects the base methods of a [`ClientType`],
//! runs them through the [`TransformPipeline`] and merges in extra members,
//! producing an [`AssembledClient`]. Nothing touches the network here; an
//! unknown feature fails the build before any client exists.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::Result;
use crate::client::{BaseClient, Client};
use crate::feature::{Feature, FeatureRegistry, TransformPipeline};
use crate::method::MethodMap;
use crate::registry::{ClientType, collect_base_methods};

/// Builds assembled clients from a base type and a feature registry.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    base: ClientType,
    pipeline: TransformPipeline,
}

impl ClientFactory {
    /// Factory over `base`, resolving features in `registry`
    #[must_use]
    pub fn new(base: ClientType, registry: Arc<FeatureRegistry>) -> Self {
        Self {
            base,
            pipeline: TransformPipeline::new(registry),
        }
    }

    /// Factory over the Web API client type
    #[must_use]
    pub fn web(registry: Arc<FeatureRegistry>) -> Self {
        Self::new(ClientType::web(), registry)
    }

    /// Assemble a client type.
    ///
    /// `features` are applied in order; an empty slice applies every
    /// registered feature. Entries of `extra` are added last and win over
    /// transformed methods of the same name.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFeature` for an unregistered name, or the
    /// first error a transform reports.
    pub fn build(&self, features: &[Feature], extra: MethodMap) -> Result<Arc<AssembledClient>> {
        let base = collect_base_methods(&self.base);
        let applied = self.pipeline.apply(base, features)?;

        let mut methods = applied.methods;
        methods.merge(extra);

        let assembled = AssembledClient {
            name: self.base.name().to_string(),
            doc: describe(&applied.features),
            features: applied.features,
            methods,
            attributes: self.base.attributes(),
        };
        info!(
            client = %assembled.name,
            features = ?assembled.features,
            methods = assembled.methods.len(),
            "Assembled client"
        );
        Ok(Arc::new(assembled))
    }

    /// Assemble with every registered feature and no extras
    ///
    /// # Errors
    ///
    /// Returns the first error a transform reports.
    pub fn build_default(&self) -> Result<Arc<AssembledClient>> {
        self.build(&[], MethodMap::new())
    }
}

fn describe(features: &[String]) -> String {
    if features.is_empty() {
        "A Slack API client with no additional features.".to_string()
    } else {
        format!(
            "A Slack API client with the following features: {}",
            features.join(", ")
        )
    }
}

/// A composed client type: the final method map plus the base type's
/// attributes, tagged with the features applied.
pub struct AssembledClient {
    name: String,
    doc: String,
    features: Vec<String>,
    methods: MethodMap,
    attributes: BTreeMap<String, Value>,
}

impl AssembledClient {
    /// Name of the base client type
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description listing the applied features
    #[must_use]
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Features applied, in order
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Final method map
    #[must_use]
    pub fn methods(&self) -> &MethodMap {
        &self.methods
    }

    /// Non-method members inherited from the base type
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Create a callable client over `base`
    #[must_use]
    pub fn instantiate(self: &Arc<Self>, base: BaseClient) -> Client {
        Client::new(Arc::clone(self), base)
    }
}

impl fmt::Debug for AssembledClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssembledClient")
            .field("name", &self.name)
            .field("features", &self.features)
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::client::API_CALL;
    use crate::config::Config;
    use crate::feature::{PAGINATION, RATE_LIMIT, RESPONSE_CACHE};
    use crate::method::{CallArgs, method};
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    fn factory() -> ClientFactory {
        ClientFactory::web(Arc::new(FeatureRegistry::builtin(&Config::default())))
    }

    #[test]
    fn default_build_applies_every_feature_in_order() {
        let class = factory().build_default().unwrap();
        assert_eq!(class.features(), [PAGINATION, RATE_LIMIT, RESPONSE_CACHE]);
        assert_eq!(
            class.doc(),
            "A Slack API client with the following features: pagination, rate_limit, response_cache"
        );
        assert_eq!(class.name(), "SlackClient");
    }

    #[test]
    fn transformed_map_keeps_every_base_method() {
        let base = collect_base_methods(&ClientType::web());
        let class = factory().build_default().unwrap();
        for name in base.names() {
            assert!(class.methods().contains(name), "{name} missing");
        }
    }

    #[test]
    fn subset_records_only_requested_features() {
        let class = factory().build(&[RATE_LIMIT.into()], MethodMap::new()).unwrap();
        assert_eq!(class.features(), [RATE_LIMIT]);
    }

    #[test]
    fn unknown_feature_fails_the_build() {
        let err = factory()
            .build(&["not_a_feature".into()], MethodMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFeature(name) if name == "not_a_feature"));
    }

    #[test]
    fn extras_win_over_transformed_methods() {
        let extra = MethodMap::new()
            .with("users_list", method(|_, _| Ok(json!("extra"))))
            .with("hello", method(|_, _| Ok(json!("hi"))));
        let client = factory()
            .build(&[], extra)
            .unwrap()
            .instantiate(BaseClient::new(Arc::new(ScriptedTransport::new())));

        assert_eq!(client.call("users_list", CallArgs::new()).unwrap(), json!("extra"));
        assert_eq!(client.call("hello", CallArgs::new()).unwrap(), json!("hi"));
    }

    #[test]
    fn attributes_are_kept_apart_from_methods() {
        let class = factory().build_default().unwrap();
        assert!(class.attributes().contains_key("BASE_URL"));
        assert!(!class.methods().contains("BASE_URL"));
        assert!(class.methods().contains(API_CALL));
    }

    #[test]
    fn no_features_gives_plain_description() {
        let class = ClientFactory::web(Arc::new(FeatureRegistry::empty()))
            .build_default()
            .unwrap();
        assert!(class.features().is_empty());
        assert_eq!(class.doc(), "A Slack API client with no additional features.");
    }
}

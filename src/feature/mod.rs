//! Features: named transforms over a client's method map.
//!
//! Each feature implements [`Transform`] and is registered under a name in
//! a [`FeatureRegistry`]. The [`pipeline::TransformPipeline`] folds the
//! requested features over the base method map.
//!
//! # Built-in Features
//!
//! | Name | Transform | Touches |
//! |------|-----------|---------|
//! | `pagination` | [`PaginationTransform`] | cursor-paginated endpoints |
//! | `rate_limit` | [`RateLimitTransform`] | `api_call` only |
//! | `response_cache` | [`ResponseCacheTransform`] | allowlisted read endpoints |
//!
//! The opt-in [`enhancement::enhancement`] transform is not registered; pass
//! it as a [`Feature::Custom`].
//!
//! # Ordering
//!
//! `rate_limit` only replaces `api_call`, so it composes with anything.
//! `pagination` and `response_cache` overlap on list endpoints: with
//! pagination first (the registered order) the cache stores the flattened
//! list; the other way round it stores the first raw page.

pub mod enhancement;
pub mod pagination;
pub mod pipeline;
pub mod rate_limit;
pub mod response_cache;

pub use pagination::PaginationTransform;
pub use pipeline::{Applied, TransformPipeline};
pub use rate_limit::{RateLimitTransform, RetryBudget, Sleeper, ThreadSleeper};
pub use response_cache::{CACHE_STATS, ResponseCacheTransform};

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::method::MethodMap;
use crate::{Error, Result};

/// Name of the pagination feature
pub const PAGINATION: &str = "pagination";
/// Name of the rate limit feature
pub const RATE_LIMIT: &str = "rate_limit";
/// Name of the response cache feature
pub const RESPONSE_CACHE: &str = "response_cache";

/// A transform of a method map.
///
/// The map is taken by value and a new one returned, so nothing a transform
/// does is visible through the caller's map. A transform whose
/// target entries are absent must leave the map unchanged rather than fail.
pub trait Transform: Send + Sync {
    /// Produce the transformed map
    fn apply(&self, methods: MethodMap) -> Result<MethodMap>;
}

impl<F> Transform for F
where
    F: Fn(MethodMap) -> Result<MethodMap> + Send + Sync,
{
    fn apply(&self, methods: MethodMap) -> Result<MethodMap> {
        self(methods)
    }
}

/// A feature requested at build time
#[derive(Clone)]
pub enum Feature {
    /// Look up a registered feature by name
    Named(String),
    /// Apply this transform directly, recorded under `name`
    Custom {
        /// Name recorded in the assembled client's feature list
        name: String,
        /// The transform
        transform: Arc<dyn Transform>,
    },
}

impl Feature {
    /// Custom transform bypassing the registry
    pub fn custom(name: impl Into<String>, transform: impl Transform + 'static) -> Self {
        Self::Custom {
            name: name.into(),
            transform: Arc::new(transform),
        }
    }

    /// Name recorded for this feature
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) | Self::Custom { name, .. } => name,
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Custom { name, .. } => f
                .debug_struct("Custom")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

impl From<&str> for Feature {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for Feature {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Ordered name -> transform table, immutable once built.
///
/// Built once at startup and shared by `Arc`; the declaration order is the
/// order used when a build requests no features.
pub struct FeatureRegistry {
    features: Vec<(String, Arc<dyn Transform>)>,
}

impl FeatureRegistry {
    /// Start building a registry
    #[must_use]
    pub fn builder() -> FeatureRegistryBuilder {
        FeatureRegistryBuilder {
            features: Vec::new(),
        }
    }

    /// Registry with no features
    #[must_use]
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Registry holding the built-in features configured from `config`,
    /// in the order pagination, rate limit, response cache.
    #[must_use]
    pub fn builtin(config: &Config) -> Self {
        Self::builder().with_builtin(config).build()
    }

    /// Look up a feature by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| Arc::clone(t))
    }

    /// Feature names in declaration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Every feature in declaration order
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Transform>)> {
        self.features.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Number of registered features
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if no features are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::builtin(&Config::default())
    }
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("features", &self.names())
            .finish()
    }
}

/// Builder for [`FeatureRegistry`].
pub struct FeatureRegistryBuilder {
    features: Vec<(String, Arc<dyn Transform>)>,
}

impl FeatureRegistryBuilder {
    /// Register a feature after those already registered
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateFeature` if the name is taken.
    pub fn register(
        mut self,
        name: impl Into<String>,
        transform: impl Transform + 'static,
    ) -> Result<Self> {
        let name = name.into();
        if self.features.iter().any(|(n, _)| *n == name) {
            return Err(Error::DuplicateFeature(name));
        }
        self.features.push((name, Arc::new(transform)));
        Ok(self)
    }

    /// Register the built-in features, replacing any earlier registration
    /// of the same names.
    #[must_use]
    pub fn with_builtin(mut self, config: &Config) -> Self {
        let builtin: [(&str, Arc<dyn Transform>); 3] = [
            (
                PAGINATION,
                Arc::new(PaginationTransform::from_config(&config.pagination)),
            ),
            (
                RATE_LIMIT,
                Arc::new(RateLimitTransform::from_config(&config.rate_limit)),
            ),
            (
                RESPONSE_CACHE,
                Arc::new(ResponseCacheTransform::from_config(&config.cache)),
            ),
        ];

        for (name, transform) in builtin {
            self.features.retain(|(n, _)| n != name);
            self.features.push((name.to_string(), transform));
        }
        self
    }

    /// Finalise and produce a [`FeatureRegistry`].
    #[must_use]
    pub fn build(self) -> FeatureRegistry {
        FeatureRegistry {
            features: self.features,
        }
    }
}

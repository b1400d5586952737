//! Memoization of read-only endpoints.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use super::Transform;
use crate::Result;
use crate::cache::ResponseCache;
use crate::config::CacheConfig;
use crate::endpoints::CACHEABLE_ENDPOINTS;
use crate::method::{Method, MethodMap, method};

/// Method reporting the statistics of the installed cache
pub const CACHE_STATS: &str = "cache_stats";

/// Caches successful results of allowlisted endpoints.
///
/// Every `apply` creates a fresh [`ResponseCache`] shared by the wrapped
/// methods of that map, so each assembled client type gets its own store.
/// Its counters are exposed as the [`CACHE_STATS`] method.
#[derive(Debug, Clone)]
pub struct ResponseCacheTransform {
    endpoints: BTreeSet<String>,
    ttl: Option<Duration>,
    max_entries: Option<usize>,
}

impl ResponseCacheTransform {
    /// Unbounded cache over `endpoints`
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ttl: None,
            max_entries: None,
        }
    }

    /// Expire entries after `ttl`
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Keep at most `max` entries, evicting the oldest
    #[must_use]
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Built-in allowlist adjusted by `config`
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let endpoints = CACHEABLE_ENDPOINTS
            .iter()
            .map(|e| (*e).to_string())
            .chain(config.extra_endpoints.iter().cloned())
            .filter(|e| !config.exclude.contains(e));

        Self {
            endpoints: endpoints.collect(),
            ttl: config.ttl,
            max_entries: config.max_entries,
        }
    }

    /// Endpoints eligible for caching, sorted
    #[must_use]
    pub fn endpoints(&self) -> &BTreeSet<String> {
        &self.endpoints
    }
}

impl Default for ResponseCacheTransform {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl Transform for ResponseCacheTransform {
    fn apply(&self, mut methods: MethodMap) -> Result<MethodMap> {
        let cache = Arc::new(ResponseCache::new(self.ttl, self.max_entries));

        for endpoint in &self.endpoints {
            let Some(inner) = methods.remove(endpoint) else {
                continue;
            };
            methods.insert(
                endpoint.clone(),
                memoized(endpoint.clone(), inner, Arc::clone(&cache)),
            );
        }
        methods.insert(
            CACHE_STATS,
            method(move |_, _| Ok(serde_json::to_value(cache.stats())?)),
        );
        debug!(endpoints = self.endpoints.len(), "Response cache installed");
        Ok(methods)
    }
}

fn memoized(endpoint: String, inner: Method, cache: Arc<ResponseCache>) -> Method {
    method(move |client, args| {
        let key = ResponseCache::build_key(&endpoint, &args);
        trace!(key = %key, "Cache lookup");
        cache.get_or_try_insert_with(&key, || inner(client, args))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BaseClient, Client};
    use crate::factory::ClientFactory;
    use crate::feature::FeatureRegistry;
    use crate::method::CallArgs;
    use crate::registry::ClientType;
    use crate::transport::ScriptedTransport;
    use crate::Error;
    use parking_lot::Mutex;
    use serde_json::json;

    fn counting(calls: Arc<Mutex<u32>>) -> Method {
        method(move |_, args| {
            let mut calls = calls.lock();
            *calls += 1;
            Ok(json!({"call": *calls, "args": args.keyword_object()}))
        })
    }

    fn client(methods: MethodMap) -> Client {
        ClientFactory::new(ClientType::new("T"), Arc::new(FeatureRegistry::empty()))
            .build(&[], methods)
            .unwrap()
            .instantiate(BaseClient::new(Arc::new(ScriptedTransport::new())))
    }

    #[test]
    fn identical_arguments_call_through_once() {
        let calls = Arc::new(Mutex::new(0));
        let methods = ResponseCacheTransform::new(["users_info"])
            .apply(MethodMap::new().with("users_info", counting(Arc::clone(&calls))))
            .unwrap();
        let client = client(methods);

        let first = client.call("users_info", CallArgs::new().kw("user", "U1")).unwrap();
        let second = client.call("users_info", CallArgs::new().kw("user", "U1")).unwrap();

        assert_eq!(first, second);
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn different_arguments_call_through_twice() {
        let calls = Arc::new(Mutex::new(0));
        let methods = ResponseCacheTransform::new(["users_info"])
            .apply(MethodMap::new().with("users_info", counting(Arc::clone(&calls))))
            .unwrap();
        let client = client(methods);

        client.call("users_info", CallArgs::new().kw("user", "U1")).unwrap();
        client.call("users_info", CallArgs::new().kw("user", "U2")).unwrap();

        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn endpoints_outside_allowlist_are_never_memoized() {
        let calls = Arc::new(Mutex::new(0));
        let methods = ResponseCacheTransform::new(["users_info"])
            .apply(MethodMap::new().with("chat_postMessage", counting(Arc::clone(&calls))))
            .unwrap();
        let client = client(methods);

        client.call("chat_postMessage", CallArgs::new().kw("text", "hi")).unwrap();
        client.call("chat_postMessage", CallArgs::new().kw("text", "hi")).unwrap();

        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn failures_are_retried_on_next_call() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let flaky = method(move |_, _| {
            let mut calls = counter.lock();
            *calls += 1;
            if *calls == 1 {
                Err(Error::Transport("timeout".into()))
            } else {
                Ok(json!("ok"))
            }
        });
        let methods = ResponseCacheTransform::new(["team_info"])
            .apply(MethodMap::new().with("team_info", flaky))
            .unwrap();
        let client = client(methods);

        assert!(client.call("team_info", CallArgs::new()).is_err());
        assert_eq!(client.call("team_info", CallArgs::new()).unwrap(), json!("ok"));
        assert_eq!(client.call("team_info", CallArgs::new()).unwrap(), json!("ok"));
        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn clones_of_a_client_share_the_cache() {
        let calls = Arc::new(Mutex::new(0));
        let methods = ResponseCacheTransform::new(["team_info"])
            .apply(MethodMap::new().with("team_info", counting(Arc::clone(&calls))))
            .unwrap();
        let client = client(methods);
        let other = client.clone();

        client.call("team_info", CallArgs::new()).unwrap();
        other.call("team_info", CallArgs::new()).unwrap();
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn stats_method_reports_hits_and_misses() {
        let calls = Arc::new(Mutex::new(0));
        let methods = ResponseCacheTransform::new(["users_info"])
            .apply(MethodMap::new().with("users_info", counting(Arc::clone(&calls))))
            .unwrap();
        let client = client(methods);

        client.call("users_info", CallArgs::new().kw("user", "U1")).unwrap();
        client.call("users_info", CallArgs::new().kw("user", "U1")).unwrap();
        client.call("users_info", CallArgs::new().kw("user", "U2")).unwrap();

        let stats = client.call(CACHE_STATS, CallArgs::new()).unwrap();
        assert_eq!(stats["hits"], json!(1));
        assert_eq!(stats["misses"], json!(2));
        assert_eq!(stats["size"], json!(2));
    }

    #[test]
    fn config_extends_and_excludes() {
        let config = CacheConfig {
            extra_endpoints: vec!["bookmarks_list".to_string()],
            exclude: vec!["users_list".to_string()],
            ..CacheConfig::default()
        };
        let transform = ResponseCacheTransform::from_config(&config);

        assert!(transform.endpoints().contains("bookmarks_list"));
        assert!(!transform.endpoints().contains("users_list"));
        assert!(transform.endpoints().contains("users_info"));
    }
}

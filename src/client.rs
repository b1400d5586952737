//! Client instances.
//!
//! A [`Client`] pairs an [`AssembledClient`] (the composed method surface,
//! shared) with a [`BaseClient`] (transport and credentials, per instance).

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::cache::CacheStatsSnapshot;
use crate::factory::AssembledClient;
use crate::feature::CACHE_STATS;
use crate::feature::pagination::Pages;
use crate::method::CallArgs;
use crate::transport::{ApiRequest, HttpVerb, Transport};
use crate::{Error, Result};

/// Name of the low-level dispatch method every endpoint routes through.
pub const API_CALL: &str = "api_call";

/// Transport plus credentials: the part of a client no feature touches.
#[derive(Clone)]
pub struct BaseClient {
    transport: Arc<dyn Transport>,
    token: Option<String>,
}

impl BaseClient {
    /// Client without a token
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            token: None,
        }
    }

    /// Set the bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Bearer token, if any
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Send a request straight to the transport
    pub fn dispatch(&self, request: &ApiRequest) -> Result<Value> {
        trace!(api_method = %request.api_method, "Dispatching");
        self.transport.send(self.token.as_deref(), request)
    }
}

impl fmt::Debug for BaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseClient")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// A callable client instance.
///
/// Cheap to clone; clones share the assembled method surface, and with it
/// any response cache.
#[derive(Clone)]
pub struct Client {
    class: Arc<AssembledClient>,
    base: BaseClient,
}

impl Client {
    pub(crate) fn new(class: Arc<AssembledClient>, base: BaseClient) -> Self {
        Self { class, base }
    }

    /// Invoke a method of the assembled surface by name
    pub fn call(&self, name: &str, args: CallArgs) -> Result<Value> {
        let method = self
            .class
            .methods()
            .get(name)
            .ok_or_else(|| Error::MethodNotFound(name.to_string()))?;
        method(self, args)
    }

    /// Low-level dispatch through the assembled `api_call` method
    pub fn api_call(
        &self,
        api_method: &str,
        http_verb: HttpVerb,
        params: Map<String, Value>,
    ) -> Result<Value> {
        self.call(API_CALL, ApiRequest::new(api_method, http_verb, params).to_args())
    }

    /// Lazily iterate the raw cursor pages of `name`.
    ///
    /// If `name` already has pagination applied, the single flattened
    /// result comes back as one page.
    pub fn pages(&self, name: &str, args: CallArgs) -> Result<Pages<'_>> {
        let method = self
            .class
            .methods()
            .get(name)
            .ok_or_else(|| Error::MethodNotFound(name.to_string()))?;
        Ok(Pages::new(self, name, Arc::clone(method), args))
    }

    /// Whether the assembled surface has a method called `name`
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.class.methods().contains(name)
    }

    /// Method names, sorted
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        self.class.methods().names()
    }

    /// Statistics of the response cache, or `None` when no cache is installed
    pub fn cache_stats(&self) -> Result<Option<CacheStatsSnapshot>> {
        if !self.has_method(CACHE_STATS) {
            return Ok(None);
        }
        let stats = self.call(CACHE_STATS, CallArgs::new())?;
        Ok(Some(serde_json::from_value(stats)?))
    }

    /// Feature names applied when the client was assembled, in order
    #[must_use]
    pub fn features(&self) -> &[String] {
        self.class.features()
    }

    /// The assembled surface this instance was created from
    #[must_use]
    pub fn class(&self) -> &Arc<AssembledClient> {
        &self.class
    }

    /// Transport and credentials
    #[must_use]
    pub fn base(&self) -> &BaseClient {
        &self.base
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("class", &self.class.name())
            .field("features", &self.class.features())
            .field("base", &self.base)
            .finish()
    }
}

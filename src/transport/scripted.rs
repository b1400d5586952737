//! In-memory transport that replays scripted responses.
//!
//! Useful for exercising assembled clients without a network. Each API
//! method has a queue of one-shot responses and an optional fallback that
//! answers once the queue is drained. Every request is recorded.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::Value;

use super::{ApiRequest, Transport};
use crate::error::ApiError;
use crate::{Error, Result};

type Scripted = std::result::Result<Value, ApiError>;

/// Transport answering from per-method scripts
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<Scripted>>>,
    fallback: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    /// Transport with no scripts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot success body for `api_method`
    pub fn push_ok(&self, api_method: &str, body: Value) -> &Self {
        self.push(api_method, Ok(body))
    }

    /// Queue a one-shot failure for `api_method`
    pub fn push_err(&self, api_method: &str, error: ApiError) -> &Self {
        self.push(api_method, Err(error))
    }

    /// Answer `api_method` with `body` whenever its queue is empty
    pub fn respond(&self, api_method: &str, body: Value) -> &Self {
        self.fallback.lock().insert(api_method.to_string(), body);
        self
    }

    fn push(&self, api_method: &str, response: Scripted) -> &Self {
        self.queued
            .lock()
            .entry(api_method.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Every request received so far, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests received for `api_method`
    #[must_use]
    pub fn call_count(&self, api_method: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.api_method == api_method)
            .count()
    }

    /// Total number of requests received
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, _token: Option<&str>, request: &ApiRequest) -> Result<Value> {
        self.calls.lock().push(request.clone());

        let next = self
            .queued
            .lock()
            .get_mut(&request.api_method)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(e)) => Err(e.into()),
            None => self
                .fallback
                .lock()
                .get(&request.api_method)
                .cloned()
                .ok_or_else(|| {
                    Error::Transport(format!("no scripted response for {}", request.api_method))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpVerb;
    use serde_json::{Map, json};

    fn request(api_method: &str) -> ApiRequest {
        ApiRequest::new(api_method, HttpVerb::Post, Map::new())
    }

    #[test]
    fn queue_drains_before_fallback() {
        let transport = ScriptedTransport::new();
        transport
            .push_ok("api.test", json!({"n": 1}))
            .respond("api.test", json!({"n": 0}));

        assert_eq!(transport.send(None, &request("api.test")).unwrap(), json!({"n": 1}));
        assert_eq!(transport.send(None, &request("api.test")).unwrap(), json!({"n": 0}));
        assert_eq!(transport.send(None, &request("api.test")).unwrap(), json!({"n": 0}));
        assert_eq!(transport.call_count("api.test"), 3);
    }

    #[test]
    fn unscripted_method_is_transport_error() {
        let transport = ScriptedTransport::new();
        let err = transport.send(None, &request("auth.test")).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(transport.total_calls(), 1);
    }

    #[test]
    fn scripted_failure_is_api_error() {
        let transport = ScriptedTransport::new();
        transport.push_err("users.info", ApiError::new("users.info", "user_not_found"));
        let err = transport.send(None, &request("users.info")).unwrap_err();
        assert_eq!(err.api_code(), Some("user_not_found"));
    }
}

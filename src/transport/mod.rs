//! Transport implementations for Web API calls
//!
//! The transport is the only part of the client that touches the network.
//! Everything above it (endpoint methods, features) deals in [`ApiRequest`]s
//! and JSON bodies.

mod http;
mod scripted;

pub use self::http::{HttpTransport, parse_response};
pub use self::scripted::ScriptedTransport;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::method::CallArgs;
use crate::{Error, Result};

/// HTTP verb used for an API method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    /// Parameters sent as query string
    Get,
    /// Parameters sent as form body
    Post,
}

impl HttpVerb {
    /// Wire name (`GET`/`POST`)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }
}

/// A single low-level Web API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// API method, e.g. `conversations.history`
    pub api_method: String,
    /// HTTP verb
    pub http_verb: HttpVerb,
    /// Request parameters
    pub params: Map<String, Value>,
}

impl ApiRequest {
    /// Create a request
    pub fn new(api_method: impl Into<String>, http_verb: HttpVerb, params: Map<String, Value>) -> Self {
        Self {
            api_method: api_method.into(),
            http_verb,
            params,
        }
    }

    /// Encode as `api_call` arguments: the API method is the single
    /// positional argument, `http_verb` and `params` are keywords.
    #[must_use]
    pub fn to_args(&self) -> CallArgs {
        CallArgs::new()
            .arg(self.api_method.clone())
            .kw("http_verb", self.http_verb.as_str())
            .kw("params", Value::Object(self.params.clone()))
    }

    /// Decode `api_call` arguments.
    ///
    /// The API method may also be given as the `api_method` keyword. The verb
    /// defaults to `POST`, params to an empty object.
    pub fn from_args(args: &CallArgs) -> Result<Self> {
        let api_method = args
            .positional
            .first()
            .or_else(|| args.get("api_method"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidArguments("api_call requires an API method name".into()))?;

        let http_verb = match args.get("http_verb") {
            None => HttpVerb::Post,
            Some(Value::String(s)) => HttpVerb::parse(s)
                .ok_or_else(|| Error::InvalidArguments(format!("unsupported HTTP verb: {s}")))?,
            Some(other) => {
                return Err(Error::InvalidArguments(format!(
                    "http_verb must be a string, got {other}"
                )));
            }
        };

        let params = match args.get("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(Error::InvalidArguments(format!(
                    "params must be an object, got {other}"
                )));
            }
        };

        Ok(Self::new(api_method, http_verb, params))
    }
}

/// Sends Web API requests.
///
/// Implementations return the decoded JSON body on success and
/// [`Error::Api`] when the API reports a failure (`"ok": false` or HTTP 429).
pub trait Transport: Send + Sync {
    /// Perform one request. `token` is the bearer token, if any.
    fn send(&self, token: Option<&str>, request: &ApiRequest) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_survives_args_encoding() {
        let params = json!({"channel": "C1"}).as_object().cloned().unwrap();
        let req = ApiRequest::new("conversations.history", HttpVerb::Get, params);
        assert_eq!(ApiRequest::from_args(&req.to_args()).unwrap(), req);
    }

    #[test]
    fn from_args_defaults_to_post_without_params() {
        let req = ApiRequest::from_args(&CallArgs::new().arg("api.test")).unwrap();
        assert_eq!(req.http_verb, HttpVerb::Post);
        assert!(req.params.is_empty());
    }

    #[test]
    fn from_args_accepts_keyword_method() {
        let args = CallArgs::new().kw("api_method", "auth.test").kw("http_verb", "get");
        let req = ApiRequest::from_args(&args).unwrap();
        assert_eq!(req.api_method, "auth.test");
        assert_eq!(req.http_verb, HttpVerb::Get);
    }

    #[test]
    fn from_args_rejects_missing_method() {
        let err = ApiRequest::from_args(&CallArgs::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }

    #[test]
    fn from_args_rejects_unknown_verb() {
        let args = CallArgs::new().arg("api.test").kw("http_verb", "PATCH");
        assert!(matches!(
            ApiRequest::from_args(&args),
            Err(Error::InvalidArguments(_))
        ));
    }
}

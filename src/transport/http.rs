//! Blocking HTTP transport for the Slack Web API
//!
//! Requests go to `{base_url}/{api_method}`. GET calls carry their
//! parameters in the query string, POST calls as a form body. Slack
//! reports failures in-band (`"ok": false`), except for rate limiting,
//! which also arrives as HTTP 429 with a `Retry-After` header.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::{ApiRequest, HttpVerb, Transport};
use crate::error::{ApiError, RATE_LIMITED};
use crate::{Error, Result};

/// HTTP transport backed by `reqwest`'s blocking client
pub struct HttpTransport {
    /// HTTP client
    client: Client,
    /// API root, e.g. `https://slack.com/api/`
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given API root
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .user_agent(concat!("slack-plus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, api_method: &str) -> String {
        format!("{}/{}", self.base_url, api_method)
    }
}

impl Transport for HttpTransport {
    fn send(&self, token: Option<&str>, request: &ApiRequest) -> Result<Value> {
        let url = self.url_for(&request.api_method);
        let params = form_params(&request.params);

        let mut builder = match request.http_verb {
            HttpVerb::Get => self.client.get(&url).query(&params),
            HttpVerb::Post => self.client.post(&url).form(&params),
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        debug!(api_method = %request.api_method, verb = request.http_verb.as_str(), "Sending request");
        let response = builder.send()?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let text = response.text()?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                // Non-JSON bodies still matter for 429 and other error statuses
                Err(_) if status >= 400 => Value::String(text),
                Err(e) => return Err(e.into()),
            }
        };

        parse_response(&request.api_method, status, headers, body)
    }
}

/// Turn an HTTP exchange into a body or an [`ApiError`].
///
/// - HTTP 429 is always a rate-limit error, whatever the body says.
/// - `"ok": false` yields an error coded with the body's `error` field.
/// - Other non-2xx statuses yield an error coded `http_<status>`.
pub fn parse_response(
    api_method: &str,
    status: u16,
    headers: HashMap<String, String>,
    body: Value,
) -> Result<Value> {
    let failure = |code: String| ApiError {
        method: api_method.to_string(),
        code,
        status,
        headers: headers.clone(),
        body: body.clone(),
    };

    if status == 429 {
        return Err(failure(RATE_LIMITED.to_string()).into());
    }

    if body.get("ok").and_then(Value::as_bool) == Some(false) {
        let code = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        return Err(failure(code).into());
    }

    if !(200..300).contains(&status) {
        return Err(failure(format!("http_{status}")).into());
    }

    if !body.is_object() {
        return Err(Error::Protocol(format!(
            "{api_method} returned a non-object body"
        )));
    }

    Ok(body)
}

/// Flatten JSON params into form/query pairs.
///
/// Strings go as-is, string arrays are comma-joined (`users=U1,U2`), nulls
/// are dropped and everything else is sent as JSON text.
fn form_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let encoded = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                Value::Array(items) if items.iter().all(Value::is_string) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                Value::Array(_) | Value::Object(_) => value.to_string(),
            };
            Some((key.clone(), encoded))
        })
        .collect()
}

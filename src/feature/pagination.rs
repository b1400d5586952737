//! Cursor pagination: follow `response_metadata.next_cursor` and flatten.
//!
//! A wrapped endpoint no longer accepts `cursor` or `limit` from the caller.
//! It walks every page in order and returns one JSON array holding the
//! configured result field of each page, appended as-is (no dedup).

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, trace};

use super::Transform;
use crate::client::Client;
use crate::config::PaginationConfig;
use crate::endpoints::PAGINATED_FIELDS;
use crate::method::{CallArgs, Method, MethodMap, method};
use crate::{Error, Result};

/// Request parameter carrying the continuation cursor
const CURSOR: &str = "cursor";
/// Request parameter carrying the page size
const LIMIT: &str = "limit";

/// Flattens cursor-paginated endpoints.
#[derive(Debug, Clone)]
pub struct PaginationTransform {
    /// endpoint name -> result field
    fields: HashMap<String, String>,
    page_limit: Option<u32>,
}

impl PaginationTransform {
    /// Transform paginating the given endpoint -> result field table
    #[must_use]
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self {
            fields,
            page_limit: None,
        }
    }

    /// Request `limit` items per page instead of the server default
    #[must_use]
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Built-in table with the configured overrides applied
    #[must_use]
    pub fn from_config(config: &PaginationConfig) -> Self {
        let mut fields: HashMap<String, String> = PAGINATED_FIELDS
            .iter()
            .map(|(endpoint, field)| ((*endpoint).to_string(), (*field).to_string()))
            .collect();
        fields.extend(config.fields.clone());

        Self {
            fields,
            page_limit: config.page_limit,
        }
    }

    /// endpoint name -> result field table
    #[must_use]
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

impl Default for PaginationTransform {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

impl Transform for PaginationTransform {
    fn apply(&self, mut methods: MethodMap) -> Result<MethodMap> {
        for (endpoint, field) in &self.fields {
            let Some(inner) = methods.remove(endpoint) else {
                debug!(endpoint = %endpoint, "Paginated endpoint not present, skipping");
                continue;
            };
            methods.insert(
                endpoint.clone(),
                flatten(endpoint.clone(), field.clone(), self.page_limit, inner),
            );
        }
        Ok(methods)
    }
}

fn flatten(endpoint: String, field: String, page_limit: Option<u32>, inner: Method) -> Method {
    method(move |client, mut args| {
        args.remove(CURSOR);
        args.remove(LIMIT);
        if let Some(limit) = page_limit {
            args.set(LIMIT, limit);
        }

        let mut items = Vec::new();
        for page in Pages::new(client, &endpoint, inner.clone(), args) {
            items.extend(page?.into_items(&field)?);
        }
        debug!(endpoint = %endpoint, items = items.len(), "Flattened pages");
        Ok(Value::Array(items))
    })
}

/// One response of a cursor-paginated endpoint
#[derive(Debug, Clone)]
pub struct Page {
    endpoint: String,
    body: Value,
    next_cursor: Option<String>,
}

impl Page {
    fn new(endpoint: &str, body: Value) -> Self {
        let next_cursor = body
            .pointer("/response_metadata/next_cursor")
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string);
        Self {
            endpoint: endpoint.to_string(),
            body,
            next_cursor,
        }
    }

    /// Raw response body
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Cursor of the following page; `None` on the last page
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Take the items of `field`: an array yields its elements, any other
    /// value is one item.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingPageField` if the page has no such field.
    pub fn into_items(mut self, field: &str) -> Result<Vec<Value>> {
        let value = self
            .body
            .as_object_mut()
            .and_then(|body| body.remove(field))
            .ok_or_else(|| Error::MissingPageField {
                endpoint: self.endpoint.clone(),
                field: field.to_string(),
            })?;

        Ok(match value {
            Value::Array(items) => items,
            other => vec![other],
        })
    }
}

enum State {
    Start,
    Next(String),
    Done,
}

/// Lazy, single-pass iterator over the pages of one call.
///
/// Each `next` performs one request. Iteration ends after the first page
/// without a cursor, after the first error, or with `Error::Protocol` when
/// the server hands out a cursor it already returned.
pub struct Pages<'c> {
    client: &'c Client,
    endpoint: String,
    method: Method,
    args: CallArgs,
    state: State,
    seen: HashSet<String>,
}

impl<'c> Pages<'c> {
    /// Pages of `method` called on `client` with `args`
    pub fn new(client: &'c Client, endpoint: &str, method: Method, args: CallArgs) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            method,
            args,
            state: State::Start,
            seen: HashSet::new(),
        }
    }

    fn fetch(&mut self, cursor: Option<String>) -> Result<Page> {
        let mut args = self.args.clone();
        if let Some(cursor) = cursor {
            args.set(CURSOR, cursor);
        }

        let page = Page::new(&self.endpoint, (self.method)(self.client, args)?);
        trace!(endpoint = %self.endpoint, next_cursor = ?page.next_cursor, "Fetched page");

        if let Some(next) = page.next_cursor() {
            if !self.seen.insert(next.to_string()) {
                return Err(Error::Protocol(format!(
                    "{} returned cursor '{next}' twice",
                    self.endpoint
                )));
            }
            self.state = State::Next(next.to_string());
        }
        Ok(page)
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = match std::mem::replace(&mut self.state, State::Done) {
            State::Done => return None,
            State::Start => None,
            State::Next(cursor) => Some(cursor),
        };
        Some(self.fetch(cursor))
    }
}

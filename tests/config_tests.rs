//! Configuration file driving client assembly

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;

use slack_plus::feature::{PAGINATION, RESPONSE_CACHE};
use slack_plus::transport::ScriptedTransport;
use slack_plus::{BaseClient, CallArgs, ClientFactory, Config, Feature, FeatureRegistry, MethodMap};

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn loaded_config_shapes_the_builtin_features() {
    let file = write_config(
        r"
features: [pagination, response_cache]
pagination:
  page_limit: 200
cache:
  exclude: [users_info]
  max_entries: 10
rate_limit:
  max_attempts: 3
  default_retry_after: 500ms
",
    );
    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.rate_limit.default_retry_after, Duration::from_millis(500));

    let features: Vec<Feature> = config.features.iter().map(|f| Feature::from(f.as_str())).collect();
    let class = ClientFactory::web(Arc::new(FeatureRegistry::builtin(&config)))
        .build(&features, MethodMap::new())
        .unwrap();
    assert_eq!(class.features(), [PAGINATION, RESPONSE_CACHE]);

    let transport = Arc::new(ScriptedTransport::new());
    transport
        .respond("users.info", json!({"ok": true}))
        .push_ok("users.list", json!({"members": ["U1"]}));
    let client = class.instantiate(BaseClient::new(transport.clone()));

    // users_info excluded from the cache
    client.call("users_info", CallArgs::new().kw("user", "U1")).unwrap();
    client.call("users_info", CallArgs::new().kw("user", "U1")).unwrap();
    assert_eq!(transport.call_count("users.info"), 2);

    // configured page size replaces the caller's
    client.call("users_list", CallArgs::new().kw("limit", 5)).unwrap();
    let list = transport
        .calls()
        .into_iter()
        .find(|r| r.api_method == "users.list")
        .unwrap();
    assert_eq!(list.params["limit"], json!(200));
}

#[test]
fn extra_pagination_fields_extend_the_table() {
    let file = write_config(
        r"
pagination:
  fields:
    bookmarks_list: bookmarks
",
    );
    let config = Config::load(Some(file.path())).unwrap();

    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_ok("bookmarks.list", json!({"bookmarks": [1], "response_metadata": {"next_cursor": "n"}}))
        .push_ok("bookmarks.list", json!({"bookmarks": [2]}));
    let client = ClientFactory::web(Arc::new(FeatureRegistry::builtin(&config)))
        .build(&[PAGINATION.into()], MethodMap::new())
        .unwrap()
        .instantiate(BaseClient::new(transport.clone()));

    let out = client
        .call("bookmarks_list", CallArgs::new().kw("channel_id", "C1"))
        .unwrap();
    assert_eq!(out, json!([1, 2]));
}

#[test]
fn malformed_config_is_a_config_error() {
    let file = write_config("rate_limit:\n  max_attempts: many\n");
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, slack_plus::Error::Config(_)));
}

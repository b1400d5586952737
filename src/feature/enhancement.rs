//! Convenience methods layered over the catalog endpoints.
//!
//! Not registered by default. Apply it as a custom feature, after
//! `pagination` so that `conversations_list` already returns every channel:
//!
//! ```ignore
//! let features = [PAGINATION.into(), Feature::custom("enhancement", enhancement)];
//! ```

use serde_json::Value;
use tracing::warn;

use crate::filter::{FieldPath, filter_list_by};
use crate::method::{CallArgs, MethodMap, method};
use crate::{Error, Result};

/// Name of the channel lookup method added by [`enhancement`]
pub const GET_CHANNELS_BY: &str = "get_channels_by";

/// Add `get_channels_by` to `methods`.
///
/// `get_channels_by` takes one of `name` (string), `names` or `ids` (string
/// arrays); every other keyword is forwarded to `conversations_list`. It
/// returns the matching channels as an array.
pub fn enhancement(mut methods: MethodMap) -> Result<MethodMap> {
    methods.insert(GET_CHANNELS_BY, method(get_channels_by));
    Ok(methods)
}

fn get_channels_by(client: &crate::client::Client, mut args: CallArgs) -> Result<Value> {
    let name = take_strings(&mut args, "name")?;
    let names = take_strings(&mut args, "names")?;
    let ids = take_strings(&mut args, "ids")?;

    let (field, query) = match (name.or(names), ids) {
        (Some(names), _) if !names.is_empty() => ("name", names),
        (_, Some(ids)) if !ids.is_empty() => {
            if ids.len() == 1 {
                warn!(
                    "get_channels_by(ids) with a single id lists every channel; \
                     conversations_info(channel) makes one request"
                );
            }
            ("id", ids)
        }
        _ => {
            return Err(Error::InvalidArguments(
                "must supply at least one of: name, names, or ids".to_string(),
            ));
        }
    };

    let listed = client.call("conversations_list", args)?;
    let channels = match listed {
        Value::Array(items) => items,
        Value::Object(mut body) => match body.remove("channels") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::Protocol(
                    "conversations_list returned no channels array".to_string(),
                ));
            }
        },
        other => {
            return Err(Error::Protocol(format!(
                "unexpected conversations_list result: {other}"
            )));
        }
    };

    let path = FieldPath::parse(field)?;
    Ok(Value::Array(
        filter_list_by(&path, &query, &channels, true)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

/// Remove `key` from `args` as a list of strings; a bare string is a list of one
fn take_strings(args: &mut CallArgs, key: &str) -> Result<Option<Vec<String>>> {
    let invalid = || Error::InvalidArguments(format!("'{key}' must be a string or list of strings"));
    match args.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![s])),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BaseClient, Client};
    use crate::factory::ClientFactory;
    use crate::feature::FeatureRegistry;
    use crate::registry::ClientType;
    use crate::transport::ScriptedTransport;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn client(listing: Value, seen: Arc<Mutex<Vec<CallArgs>>>) -> Client {
        let methods = MethodMap::new().with(
            "conversations_list",
            method(move |_, args| {
                seen.lock().push(args);
                Ok(listing.clone())
            }),
        );
        ClientFactory::new(ClientType::new("T"), Arc::new(FeatureRegistry::empty()))
            .build(&[], enhancement(methods).unwrap())
            .unwrap()
            .instantiate(BaseClient::new(Arc::new(ScriptedTransport::new())))
    }

    fn listing() -> Value {
        json!([
            {"id": "C1", "name": "general"},
            {"id": "C2", "name": "random"},
            {"id": "C3", "name": "dev"},
        ])
    }

    #[test]
    fn by_name() {
        let client = client(listing(), Arc::default());
        let out = client
            .call(GET_CHANNELS_BY, CallArgs::new().kw("name", "dev"))
            .unwrap();
        assert_eq!(out, json!([{"id": "C3", "name": "dev"}]));
    }

    #[test]
    fn by_ids_forwards_other_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = client(listing(), Arc::clone(&seen));
        let out = client
            .call(
                GET_CHANNELS_BY,
                CallArgs::new()
                    .kw("ids", json!(["C2", "C1"]))
                    .kw("types", "public_channel"),
            )
            .unwrap();

        assert_eq!(out, json!([{"id": "C1", "name": "general"}, {"id": "C2", "name": "random"}]));
        assert_eq!(seen.lock()[0], CallArgs::new().kw("types", "public_channel"));
    }

    #[test]
    fn accepts_unflattened_response() {
        let client = client(json!({"ok": true, "channels": listing()}), Arc::default());
        let out = client
            .call(GET_CHANNELS_BY, CallArgs::new().kw("names", json!(["general"])))
            .unwrap();
        assert_eq!(out, json!([{"id": "C1", "name": "general"}]));
    }

    #[test]
    fn requires_a_query() {
        let client = client(listing(), Arc::default());
        let err = client.call(GET_CHANNELS_BY, CallArgs::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));

        let err = client
            .call(GET_CHANNELS_BY, CallArgs::new().kw("ids", 5))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }
}

//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Slack Web API client with pagination, rate-limit retry and caching
#[derive(Parser, Debug)]
#[command(name = "slack-plus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "SLACK_PLUS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token (overrides the configured one)
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "SLACK_PLUS_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "SLACK_PLUS_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered features in application order
    Features,

    /// List catalog endpoints with their HTTP verb and classification
    Endpoints {
        /// Only endpoints whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Call one endpoint and print the JSON result
    Call {
        /// Client method name, e.g. `conversations_list`
        #[arg(required = true)]
        endpoint: String,

        /// Feature to apply (repeatable; default: all registered)
        #[arg(short, long = "feature")]
        features: Vec<String>,

        /// Keyword argument as key=value (repeatable). Values that parse as
        /// JSON are sent as JSON, anything else as a string.
        #[arg(short, long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, Value)>,
    },

    /// Look up channels by name or id
    Channels {
        /// Channel name (repeatable)
        #[arg(long = "name", required_unless_present = "ids")]
        names: Vec<String>,

        /// Channel id (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,
    },
}

/// Parse a `key=value` argument
///
/// # Errors
///
/// Returns `Error::InvalidArguments` if there is no `=` or the key is empty.
pub fn parse_key_value(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| Error::InvalidArguments(format!("expected key=value, got '{raw}'")))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect parsed `key=value` pairs; later keys win
#[must_use]
pub fn keyword_args(pairs: Vec<(String, Value)>) -> Map<String, Value> {
    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn key_value_parses_json_or_falls_back_to_string() {
        assert_eq!(parse_key_value("limit=5").unwrap(), ("limit".to_string(), json!(5)));
        assert_eq!(
            parse_key_value("channel=C123").unwrap(),
            ("channel".to_string(), json!("C123"))
        );
        assert_eq!(
            parse_key_value("types=a=b").unwrap(),
            ("types".to_string(), json!("a=b"))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn call_subcommand_collects_repeats() {
        let cli = Cli::try_parse_from([
            "slack-plus",
            "call",
            "conversations_list",
            "-f",
            "pagination",
            "-f",
            "rate_limit",
            "-a",
            "types=public_channel",
        ])
        .unwrap();

        match cli.command {
            Command::Call {
                endpoint,
                features,
                args,
            } => {
                assert_eq!(endpoint, "conversations_list");
                assert_eq!(features, vec!["pagination", "rate_limit"]);
                assert_eq!(keyword_args(args)["types"], json!("public_channel"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn channels_requires_a_query() {
        assert!(Cli::try_parse_from(["slack-plus", "channels"]).is_err());
        assert!(Cli::try_parse_from(["slack-plus", "channels", "--id", "C1"]).is_ok());
    }
}

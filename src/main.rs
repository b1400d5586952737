//! Slack Plus - Slack Web API client with composable features

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::{debug, error};

use slack_plus::{
    BaseClient, CallArgs, ClientFactory, Config, Feature, FeatureRegistry, MethodMap, Result,
    cli::{Cli, Command, keyword_args},
    endpoints::{self, CACHEABLE_ENDPOINTS, PAGINATED_FIELDS},
    feature::{PAGINATION, enhancement::{GET_CHANNELS_BY, enhancement}},
    setup_tracing,
    transport::HttpTransport,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Features => {
            run_features(&config);
            Ok(())
        }
        Command::Endpoints { filter } => {
            run_endpoints(filter.as_deref());
            Ok(())
        }
        Command::Call {
            endpoint,
            features,
            args,
        } => run_call(&config, cli.token, &endpoint, &features, CallArgs::from(keyword_args(args))),
        Command::Channels { names, ids } => run_channels(&config, cli.token, names, ids),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_features(config: &Config) {
    let registry = FeatureRegistry::builtin(config);
    for name in registry.names() {
        println!("{name}");
    }
}

fn run_endpoints(filter: Option<&str>) {
    let paginated = |name: &str| PAGINATED_FIELDS.iter().find(|(e, _)| *e == name).map(|(_, f)| *f);

    for endpoint in endpoints::ENDPOINTS {
        let name = endpoint.name();
        if filter.is_some_and(|f| !name.contains(f)) {
            continue;
        }
        let mut tags = Vec::new();
        if let Some(field) = paginated(&name) {
            tags.push(format!("paginated:{field}"));
        }
        if CACHEABLE_ENDPOINTS.contains(&name.as_str()) {
            tags.push("cached".to_string());
        }
        println!(
            "{:<4} {name:<50} {}",
            endpoint.http_verb.as_str(),
            tags.join(" ")
        );
    }
}

fn base_client(config: &Config, token: Option<String>) -> Result<BaseClient> {
    let transport = HttpTransport::new(&config.api.base_url, config.api.timeout)?;
    let base = BaseClient::new(Arc::new(transport));
    Ok(match token.or_else(|| config.api.resolve_token()) {
        Some(token) => base.with_token(token),
        None => base,
    })
}

/// Requested features, falling back to the configured list
fn requested(features: &[String], config: &Config) -> Vec<Feature> {
    let names = if features.is_empty() {
        config.features.as_slice()
    } else {
        features
    };
    names.iter().map(|n| Feature::from(n.as_str())).collect()
}

fn run_call(
    config: &Config,
    token: Option<String>,
    endpoint: &str,
    features: &[String],
    args: CallArgs,
) -> Result<()> {
    let factory = ClientFactory::web(Arc::new(FeatureRegistry::builtin(config)));
    let client = factory
        .build(&requested(features, config), MethodMap::new())?
        .instantiate(base_client(config, token)?);
    debug!(client = ?client, endpoint, "Calling");

    let result = client.call(endpoint, args)?;
    if let Some(stats) = client.cache_stats()? {
        debug!(hits = stats.hits, misses = stats.misses, "Response cache");
    }
    print_json(&result)
}

fn run_channels(
    config: &Config,
    token: Option<String>,
    names: Vec<String>,
    ids: Vec<String>,
) -> Result<()> {
    let factory = ClientFactory::web(Arc::new(FeatureRegistry::builtin(config)));
    let features = [PAGINATION.into(), Feature::custom("enhancement", enhancement)];
    let client = factory
        .build(&features, MethodMap::new())?
        .instantiate(base_client(config, token)?);

    let args = if names.is_empty() {
        CallArgs::new().kw("ids", ids)
    } else {
        CallArgs::new().kw("names", names)
    };
    print_json(&client.call(GET_CHANNELS_BY, args)?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

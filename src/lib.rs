//! Slack Plus
//!
//! A Slack Web API client assembled from composable features.
//!
//! # Features
//!
//! - **Pagination**: cursor-paginated endpoints return one flattened list
//! - **Rate limiting**: `ratelimited` responses are waited out and retried
//! - **Response cache**: read-only endpoints are memoized per argument set
//! - **Custom transforms**: any `Fn(MethodMap) -> Result<MethodMap>`
//!
//! # Assembly
//!
//! A [`ClientFactory`] takes the base method map of a [`ClientType`], folds
//! the requested features over it in order and merges caller-supplied
//! extras, yielding an [`AssembledClient`]. Instantiating that against a
//! [`BaseClient`] (transport plus token) gives a callable [`Client`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod factory;
pub mod feature;
pub mod filter;
pub mod method;
pub mod registry;
pub mod transport;

pub use client::{BaseClient, Client};
pub use config::Config;
pub use error::{ApiError, Error, Result};
pub use factory::{AssembledClient, ClientFactory};
pub use feature::{Feature, FeatureRegistry, Transform};
pub use method::{CallArgs, Method, MethodMap, method};
pub use registry::{ClientLayer, ClientType, collect_base_methods};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` takes precedence over `level`. A `format` of `json` selects
/// JSON lines; anything else is human-readable text. Logs go to stderr so
/// command output on stdout stays parseable.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Config(e.to_string()))?;
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Config(e.to_string()))?;
        }
    }

    Ok(())
}

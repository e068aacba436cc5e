use std::env;
use std::sync::Arc;

use crate::cache::ReportCache;
use crate::error::ConfigError;
use crate::inventory::ComputeApi;

const DEFAULT_PROJECT_ID: &str = "devops-realm";
const DEFAULT_REGION: &str = "europe-west4";
const DEFAULT_REDIS_HOST: &str = "localhost";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_CACHE_TTL: u64 = 300;
const DEFAULT_HTTP_PORT: &str = "8080";
const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project whose networks are listed.
    pub project_id: String,
    /// The single region whose subnets are listed.
    pub region: String,
    pub redis_host: String,
    pub redis_port: u16,
    /// Empty means no authentication.
    pub redis_password: String,
    /// Lifetime of the cached report, in seconds.
    pub cache_ttl: u64,
    /// Address to bind the HTTP server to.
    pub bind_address: String,
    /// Base URL of the Compute Engine REST API.
    pub compute_endpoint: String,
    /// Static bearer token; when unset the metadata server is asked.
    pub access_token: Option<String>,
}

impl Config {
    /// Creates Config from environment variables with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let port = var("PORT", DEFAULT_HTTP_PORT);
        let bind_address = var("BIND_ADDRESS", &format!("0.0.0.0:{port}"));

        Ok(Self {
            project_id: var("PROJECT_ID", DEFAULT_PROJECT_ID),
            region: var("REGION", DEFAULT_REGION),
            redis_host: var("REDIS_HOST", DEFAULT_REDIS_HOST),
            redis_port: parse_number("REDIS_PORT", lookup("REDIS_PORT"), DEFAULT_REDIS_PORT)?,
            redis_password: var("REDIS_PASSWORD", ""),
            cache_ttl: parse_number("CACHE_TTL", lookup("CACHE_TTL"), DEFAULT_CACHE_TTL)?,
            bind_address,
            compute_endpoint: var("COMPUTE_API_ENDPOINT", DEFAULT_COMPUTE_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            access_token: lookup("GOOGLE_OAUTH_ACCESS_TOKEN").filter(|t| !t.is_empty()),
        })
    }
}

fn parse_number<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidNumber {
                name,
                value,
                source,
            }),
    }
}

/// Shared application state passed to all request handlers.
///
/// Built once at startup and never mutated afterwards.
pub struct AppState {
    pub config: Config,
    /// Cache for the discovery report; may be disabled.
    pub cache: ReportCache,
    /// Inventory API used on cache misses and forced refreshes.
    pub compute: Arc<dyn ComputeApi>,
}

impl AppState {
    pub fn new(config: Config, cache: ReportCache, compute: Arc<dyn ComputeApi>) -> Self {
        Self {
            config,
            cache,
            compute,
        }
    }
}

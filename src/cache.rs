//! Best-effort report cache backed by Redis.
//!
//! Every operation degrades instead of failing: a disabled or broken cache
//! reads as a miss and writes report `false`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::models::Report;
use crate::state::Config;

/// Key under which the single report is stored.
pub const REPORT_KEY: &str = "vpc_report";

/// Connect and response timeout for the Redis connection. Connects are
/// attempted once; a failed connect is never retried.
const REDIS_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal key-value operations the report cache needs.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Redis implementation of [`CacheBackend`].
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Opens a managed connection and verifies it with `PING`.
    pub async fn connect(config: &Config) -> Result<Self, CacheError> {
        let password = Some(config.redis_password.clone()).filter(|p| !p.is_empty());
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.redis_host.clone(), config.redis_port),
            redis: RedisConnectionInfo {
                password,
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(0)
            .set_connection_timeout(REDIS_TIMEOUT)
            .set_response_timeout(REDIS_TIMEOUT);

        let conn = tokio::time::timeout(
            REDIS_TIMEOUT,
            client.get_connection_manager_with_config(manager_config),
        )
        .await
        .map_err(|_| CacheError::Timeout)??;

        let backend = Self { conn };
        backend.ping().await?;
        Ok(backend)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Report cache that tolerates a missing backend.
pub struct ReportCache {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl_secs: u64,
}

impl ReportCache {
    /// Connects to Redis, falling back to a disabled cache on any failure.
    pub async fn connect(config: &Config) -> Self {
        match RedisBackend::connect(config).await {
            Ok(backend) => {
                info!(
                    host = %config.redis_host,
                    port = config.redis_port,
                    "Redis connected successfully"
                );
                Self::with_backend(Arc::new(backend), config.cache_ttl)
            }
            Err(e) => {
                warn!(
                    host = %config.redis_host,
                    port = config.redis_port,
                    "Redis connection failed, caching disabled: {}",
                    e
                );
                Self::disabled(config.cache_ttl)
            }
        }
    }

    pub fn with_backend(backend: Arc<dyn CacheBackend>, ttl_secs: u64) -> Self {
        Self {
            backend: Some(backend),
            ttl_secs,
        }
    }

    pub fn disabled(ttl_secs: u64) -> Self {
        Self {
            backend: None,
            ttl_secs,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Reads the stored report. Any failure is logged and reads as a miss.
    pub async fn get_cached_report(&self) -> Option<Report> {
        let backend = self.backend.as_ref()?;
        match Self::read(backend.as_ref()).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Error getting cached report: {}", e);
                None
            }
        }
    }

    async fn read(backend: &dyn CacheBackend) -> Result<Option<Report>, CacheError> {
        match backend.get(REPORT_KEY).await? {
            Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    /// Stores `report` under the fixed key with the configured TTL.
    ///
    /// Returns whether the write succeeded.
    pub async fn cache_report(&self, report: &Report) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        let result: Result<(), CacheError> = async {
            let payload = serde_json::to_string_pretty(report)?;
            backend.set_ex(REPORT_KEY, &payload, self.ttl_secs).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(ttl = self.ttl_secs, "Report cached");
                true
            }
            Err(e) => {
                warn!("Error caching report: {}", e);
                false
            }
        }
    }

    /// Whether the backend currently answers a ping.
    pub async fn ping(&self) -> bool {
        match self.backend.as_ref() {
            Some(backend) => match backend.ping().await {
                Ok(()) => true,
                Err(e) => {
                    debug!("Redis ping failed: {}", e);
                    false
                }
            },
            None => false,
        }
    }
}

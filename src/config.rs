use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapter::H2Adapter;
use crate::error::AdapterError;
use crate::pool::PoolRegistry;

/// Environment switch for development mode (per-statement timing and parameter logging).
pub const DEBUG_ENV_VAR: &str = "H2_MIDDLEWARE_DEBUG";

const DEFAULT_MAX_POOL_SIZE: u32 = 25;
const DEFAULT_MIN_POOL_SIZE: u32 = 1;

/// Normalized connection URL identifying one physical H2 database.
///
/// Two adapters whose options normalize to the same target share one pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionTarget(String);

impl ConnectionTarget {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static pool configuration of a target.
#[derive(Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub target: ConnectionTarget,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for PoolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolSettings")
            .field("target", &self.target)
            .field("min_pool_size", &self.min_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Options for connecting an [`H2Adapter`].
///
/// Either `path` (embedded/auto-server database file) or `host` (TCP server) must be set.
/// Deserializes from the same camelCase JSON the data layer stores in its configuration:
/// ```rust
/// use h2_middleware::prelude::*;
///
/// let opts = AdapterOptions::from_json(r#"{"host":"db1","port":9092,"database":"shop","pool":5}"#)?;
/// assert_eq!(opts.target()?.as_str(), "jdbc:h2:tcp://db1:9092/shop;AUTO_RECONNECT=true");
/// # Ok::<(), AdapterError>(())
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterOptions {
    pub path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Maximum pool size for the target.
    pub pool: Option<u32>,
    /// Development mode: log every statement with its timing and parameters.
    pub statement_logging: bool,
}

impl fmt::Debug for AdapterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterOptions")
            .field("path", &self.path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("pool", &self.pool)
            .field("statement_logging", &self.statement_logging)
            .finish_non_exhaustive()
    }
}

impl AdapterOptions {
    /// Options for an embedded database file.
    #[must_use]
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            statement_logging: debug_from_env(),
            ..Self::default()
        }
    }

    /// Options for a TCP server database.
    #[must_use]
    pub fn with_host(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            database: Some(database.into()),
            statement_logging: debug_from_env(),
            ..Self::default()
        }
    }

    /// Parse options from JSON.
    ///
    /// # Errors
    /// Returns `AdapterError::ConfigError` if the JSON does not describe adapter options.
    pub fn from_json(json: &str) -> Result<Self, AdapterError> {
        let mut opts: AdapterOptions = serde_json::from_str(json)
            .map_err(|e| AdapterError::ConfigError(format!("invalid adapter options: {e}")))?;
        opts.statement_logging |= debug_from_env();
        Ok(opts)
    }

    /// Normalized connection target.
    ///
    /// # Errors
    /// Returns `AdapterError::ConfigError` when neither a path nor a host is configured.
    pub fn target(&self) -> Result<ConnectionTarget, AdapterError> {
        if let Some(path) = self.path.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(ConnectionTarget(format!(
                "jdbc:h2:{};AUTO_SERVER=true;AUTO_RECONNECT=true",
                path.trim()
            )));
        }
        if let Some(host) = self.host.as_deref().filter(|h| !h.trim().is_empty()) {
            let host = match self.port {
                Some(port) => format!("{}:{port}", host.trim()),
                None => host.trim().to_string(),
            };
            let database = self.database.as_deref().unwrap_or_default().trim();
            return Ok(ConnectionTarget(format!(
                "jdbc:h2:tcp://{host}/{database};AUTO_RECONNECT=true"
            )));
        }
        Err(AdapterError::ConfigError(
            "database path or host may not be empty".into(),
        ))
    }

    /// Pool configuration derived from these options.
    ///
    /// # Errors
    /// Propagates [`AdapterOptions::target`] errors; a zero pool size is rejected.
    pub fn pool_settings(&self) -> Result<PoolSettings, AdapterError> {
        let max_pool_size = self.pool.unwrap_or(DEFAULT_MAX_POOL_SIZE);
        if max_pool_size == 0 {
            return Err(AdapterError::ConfigError(
                "pool size must be at least 1".into(),
            ));
        }
        Ok(PoolSettings {
            target: self.target()?,
            min_pool_size: DEFAULT_MIN_POOL_SIZE.min(max_pool_size),
            max_pool_size,
            user: self.user.clone(),
            password: self.password.clone(),
        })
    }
}

fn debug_from_env() -> bool {
    std::env::var_os(DEBUG_ENV_VAR).is_some()
}

/// Fluent builder for [`AdapterOptions`].
#[derive(Debug, Clone)]
pub struct AdapterOptionsBuilder {
    opts: AdapterOptions,
}

impl AdapterOptionsBuilder {
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            opts: AdapterOptions::with_path(path),
        }
    }

    #[must_use]
    pub fn host(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            opts: AdapterOptions::with_host(host, database),
        }
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = Some(port);
        self
    }

    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.opts.user = Some(user.into());
        self.opts.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn pool_size(mut self, max: u32) -> Self {
        self.opts.pool = Some(max);
        self
    }

    #[must_use]
    pub fn statement_logging(mut self, enabled: bool) -> Self {
        self.opts.statement_logging = enabled;
        self
    }

    #[must_use]
    pub fn finish(self) -> AdapterOptions {
        self.opts
    }

    /// Build an adapter bound to `registry`.
    ///
    /// # Errors
    /// Returns `AdapterError::ConfigError` if the options do not resolve to a target.
    pub fn build(self, registry: Arc<PoolRegistry>) -> Result<H2Adapter, AdapterError> {
        H2Adapter::new(self.finish(), registry)
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bb8::Pool;
use tokio::sync::Mutex;

use super::{H2Manager, PooledConnection};
use crate::config::{ConnectionTarget, PoolSettings};
use crate::driver::Connector;
use crate::error::AdapterError;

/// Process-level registry of connection pools, one per connection target.
///
/// Create it once at startup, share it (`Arc`) with every adapter, and call
/// [`PoolRegistry::shutdown`] when the process winds down. Pools are created lazily on
/// the first reservation against a target and are never replaced while registered.
pub struct PoolRegistry {
    connector: Arc<dyn Connector>,
    pools: Mutex<HashMap<ConnectionTarget, Pool<H2Manager>>>,
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry").finish_non_exhaustive()
    }
}

impl PoolRegistry {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Convenience constructor returning the registry ready to share.
    #[must_use]
    pub fn shared(connector: impl Connector) -> Arc<Self> {
        Arc::new(Self::new(Arc::new(connector)))
    }

    /// Resolve the pool for `settings.target`, creating and initializing it on first use.
    ///
    /// The registry lock is held while a new pool initializes, so concurrent first
    /// reservations against one target still produce a single pool.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionError` if initialization fails; nothing is
    /// registered in that case and the next call retries.
    pub async fn pool_for(&self, settings: &PoolSettings) -> Result<Pool<H2Manager>, AdapterError> {
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(&settings.target) {
            return Ok(pool.clone());
        }
        tracing::debug!(
            db = %settings.target,
            min = settings.min_pool_size,
            max = settings.max_pool_size,
            "creating connection pool"
        );
        let pool = H2Manager::new(settings.clone(), Arc::clone(&self.connector))
            .build_pool()
            .await?;
        pools.insert(settings.target.clone(), pool.clone());
        Ok(pool)
    }

    /// Reserve a connection from the target's pool.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionError` if the pool cannot be created or no
    /// connection can be checked out.
    pub async fn reserve(&self, settings: &PoolSettings) -> Result<PooledConnection, AdapterError> {
        let pool = self.pool_for(settings).await?;
        let conn = pool.get_owned().await?;
        tracing::debug!(db = %settings.target, "reserved connection");
        Ok(conn)
    }

    /// Connection counts of a registered pool.
    pub async fn state(&self, target: &ConnectionTarget) -> Option<bb8::State> {
        self.pools.lock().await.get(target).map(Pool::state)
    }

    pub async fn pool_count(&self) -> usize {
        self.pools.lock().await.len()
    }

    /// Unregister every pool. Idle connections close once outstanding reservations are
    /// released.
    pub async fn shutdown(&self) {
        let mut pools = self.pools.lock().await;
        tracing::debug!(pools = pools.len(), "shutting down connection pools");
        pools.clear();
    }
}

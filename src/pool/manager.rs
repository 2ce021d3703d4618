use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bb8::{ManageConnection, Pool};

use crate::config::PoolSettings;
use crate::driver::{Connector, NativeConnection};
use crate::error::{AdapterError, DriverError};

/// bb8 manager producing native connections for one target.
pub struct H2Manager {
    pub(crate) settings: PoolSettings,
    connector: Arc<dyn Connector>,
}

impl fmt::Debug for H2Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("H2Manager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl H2Manager {
    #[must_use]
    pub fn new(settings: PoolSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    /// Build a pool from this manager, opening `min_pool_size` connections up front.
    ///
    /// Connection attempts are not retried, so an unreachable target fails fast.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionError` if the pool cannot be initialized.
    pub async fn build_pool(self) -> Result<Pool<H2Manager>, AdapterError> {
        let target = self.settings.target.clone();
        Pool::builder()
            .max_size(self.settings.max_pool_size)
            .min_idle(Some(self.settings.min_pool_size))
            .retry_connection(false)
            .build(self)
            .await
            .map_err(|e| {
                AdapterError::ConnectionError(format!("H2 pool initialization failed for {target}: {e}"))
            })
    }
}

impl ManageConnection for H2Manager {
    type Connection = Box<dyn NativeConnection>;
    type Error = DriverError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let connector = Arc::clone(&self.connector);
        let settings = self.settings.clone();
        async move {
            tracing::debug!(db = %settings.target, "opening native connection");
            connector.connect(&settings).await
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.is_valid().await }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

//! Boundary to the native H2 driver.
//!
//! The adapter never talks to the engine directly: it reserves a [`NativeConnection`]
//! from a pool whose connections are produced by a [`Connector`]. Implementations wrap
//! whatever actually speaks to H2 (a JDBC bridge, the PG-wire server mode, ...).

use async_trait::async_trait;

use crate::config::PoolSettings;
use crate::error::DriverError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// One live native connection.
///
/// Parameters are positional and correspond to `?` placeholders in `sql`. Drivers that
/// cannot bind parameters can inline them with [`crate::prepare::prepare_statement`].
#[async_trait]
pub trait NativeConnection: Send {
    /// Run a statement that returns rows.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, DriverError>;

    /// Run a statement (or a `;`-separated batch) and return the affected row count.
    async fn execute_update(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, DriverError>;

    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DriverError>;

    async fn commit(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Health probe used by the pool before handing out an idle connection.
    async fn is_valid(&mut self) -> Result<(), DriverError> {
        self.query("SELECT 1", &[]).await.map(|_| ())
    }
}

/// Opens native connections for a target.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        settings: &PoolSettings,
    ) -> Result<Box<dyn NativeConnection>, DriverError>;
}

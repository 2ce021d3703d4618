//! Async H2 data adapter.
//!
//! Pooled native connections with nested transactions, an H2 SQL dialect formatter,
//! live catalog introspection, and declarative, idempotent schema migrations. The
//! native driver is pluggable through [`driver::Connector`].

pub mod adapter;
pub mod config;
pub mod driver;
pub mod error;
pub mod formatter;
pub mod migration;
pub mod model;
pub mod pool;
pub mod prelude;
pub mod prepare;
pub mod query;
pub mod results;
pub mod schema;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use adapter::{ExecuteResult, H2Adapter, Statement, TransactionState};
pub use config::{AdapterOptions, AdapterOptionsBuilder, ConnectionTarget, PoolSettings};
pub use error::{AdapterError, DriverError};
pub use migration::MigrationOutcome;
pub use pool::PoolRegistry;

//! Connection pooling: one bb8 pool per [`ConnectionTarget`](crate::config::ConnectionTarget),
//! owned by an explicit [`PoolRegistry`].

mod manager;
mod registry;

pub use manager::H2Manager;
pub use registry::PoolRegistry;

/// A native connection checked out of a target's pool.
///
/// Dropping the handle returns the connection to its pool.
pub type PooledConnection = bb8::PooledConnection<'static, H2Manager>;

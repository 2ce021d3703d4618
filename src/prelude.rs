//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::adapter::{ExecuteResult, H2Adapter, Statement, TransactionState};
pub use crate::config::{AdapterOptions, AdapterOptionsBuilder, ConnectionTarget, PoolSettings};
pub use crate::driver::{Connector, NativeConnection};
pub use crate::error::{AdapterError, DriverError};
pub use crate::formatter::{FunctionTable, H2Formatter, Renders};
pub use crate::migration::MigrationOutcome;
pub use crate::model::{
    ConstraintDescriptor, FieldDescriptor, IndexDescriptor, MigrationDescriptor,
    MigrationRecord,
};
pub use crate::pool::{PoolRegistry, PooledConnection};
pub use crate::prepare::prepare_statement;
pub use crate::query::{Expr, QueryExpression};
pub use crate::results::{DbRow, ResultSet};
pub use crate::schema::{ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot};
pub use crate::types::{FieldType, SqlValue};

//! Test support: an in-memory driver that understands the adapter's SQL.

mod memory;

pub use memory::{MemoryConnector, MemoryRow};

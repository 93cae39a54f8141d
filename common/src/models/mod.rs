//! Shared data models.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionItem, ConnectionParams, DbType, SaveConnectionRequest};
pub use query::{ColumnInfo, FieldInfo, QueryOutput, QueryRequest};

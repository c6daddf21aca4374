//! Database abstraction layer for sqlrun.
//!
//! Provides a trait-based interface for database operations so the batch
//! runner and exporter can be driven by PostgreSQL or by the in-memory mock.

mod mock;
mod postgres;
mod types;

pub use mock::{ConnectionStats, MockConnector, MockDatabaseClient};
pub use postgres::{PostgresClient, PostgresConnector};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for one live database session.
///
/// All database operations are async and return Results with SqlRunError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes the full text of a SQL file and returns its result set.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Opens database sessions from connection parameters.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Makes a single connection attempt.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}

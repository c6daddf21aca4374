//! Connection provider: one fresh database session per query unit.

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::db::{Connector, DatabaseClient, PostgresConnector};
use crate::report::{BatchEvent, Reporter};

/// Opens sessions from a fixed set of connection parameters.
///
/// Connectivity failures stop here: `acquire` reports them and returns `None`
/// instead of an error.
#[derive(Clone)]
pub struct ConnectionProvider {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
}

impl ConnectionProvider {
    /// Creates a provider using the given connector.
    pub fn new(config: ConnectionConfig, connector: impl Connector + 'static) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
        }
    }

    /// Creates a provider backed by PostgreSQL.
    pub fn postgres(config: ConnectionConfig) -> Self {
        Self::new(config, PostgresConnector)
    }

    /// The parameters every session is opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Makes a single connection attempt.
    ///
    /// Returns `None` when the database cannot be reached; the cause has
    /// already been reported and the caller must not proceed.
    pub async fn acquire(&self, reporter: &mut dyn Reporter) -> Option<Box<dyn DatabaseClient>> {
        let target = self.config.display_string();

        match self.connector.connect(&self.config).await {
            Ok(db) => {
                reporter.report(BatchEvent::Connected { target });
                Some(db)
            }
            Err(e) => {
                reporter.report(BatchEvent::ConnectionFailed {
                    target,
                    cause: e.to_string(),
                });
                None
            }
        }
    }
}

//! Execution of a single query unit with scoped connection release.
//!
//! Every unit gets its own session: acquired, used for exactly one
//! `execute_query`, and closed before `execute` returns, whatever the outcome.

use std::time::Duration;

use tracing::warn;

use crate::connection::ConnectionProvider;
use crate::db::QueryResult;
use crate::error::SqlRunError;
use crate::query::QueryUnit;
use crate::report::{BatchEvent, Reporter};

/// Executes query units against sessions from a provider.
pub struct QueryExecutor<'a> {
    provider: &'a ConnectionProvider,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(provider: &'a ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Runs one unit. Connection and query failures are reported and folded
    /// into the outcome; they never escape as errors.
    pub async fn execute(&self, unit: &QueryUnit, reporter: &mut dyn Reporter) -> UnitOutcome {
        let Some(db) = self.provider.acquire(reporter).await else {
            return UnitOutcome::NoConnection;
        };

        let result = db.execute_query(&unit.sql).await;

        if let Err(e) = db.close().await {
            warn!(file = %unit.file_name, "Failed to close connection: {e}");
        }

        match result {
            Ok(query_result) if query_result.is_empty() => UnitOutcome::Empty {
                execution_time: query_result.execution_time,
            },
            Ok(query_result) => UnitOutcome::Rows(query_result),
            Err(e) => {
                reporter.report(BatchEvent::QueryFailed {
                    file: unit.file_name.clone(),
                    cause: e.to_string(),
                });
                UnitOutcome::Failed(e)
            }
        }
    }
}

/// What executing one query unit produced.
#[derive(Debug)]
pub enum UnitOutcome {
    /// At least one row came back.
    Rows(QueryResult),
    /// The query ran but returned no rows.
    Empty { execution_time: Duration },
    /// The query failed on the server.
    Failed(SqlRunError),
    /// No session could be opened.
    NoConnection,
}

impl UnitOutcome {
    /// Returns true if the unit counts as failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::NoConnection)
    }
}

//! Mock database client for testing.
//!
//! Provides a scripted, in-memory connector so the runner and exporter can be
//! exercised without a PostgreSQL server.

use super::{ColumnInfo, Connector, DatabaseClient, QueryResult, Value};
use crate::config::ConnectionConfig;
use crate::error::{Result, SqlRunError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted outcome for one SQL text.
#[derive(Debug, Clone)]
enum MockResponse {
    Rows(QueryResult),
    Error(String),
}

/// Session bookkeeping shared by a connector and the clients it hands out.
#[derive(Debug, Default)]
struct SessionCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// Snapshot of how many sessions a `MockConnector` has handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Sessions successfully opened.
    pub opened: usize,
    /// Sessions closed.
    pub closed: usize,
    /// Sessions open right now.
    pub live: usize,
    /// Highest number of sessions that were open at the same time.
    pub max_live: usize,
}

/// A connector returning `MockDatabaseClient`s that answer from a script.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    responses: Arc<HashMap<String, MockResponse>>,
    refuse_with: Option<String>,
    counters: Arc<SessionCounters>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    /// Creates a connector with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the result returned for `sql` (matched after trimming).
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        Arc::make_mut(&mut self.responses).insert(key(sql), MockResponse::Rows(result));
        self
    }

    /// Scripts a query failure for `sql` (matched after trimming).
    pub fn with_error(mut self, sql: &str, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.responses).insert(key(sql), MockResponse::Error(message.into()));
        self
    }

    /// Makes every connection attempt fail with the given cause.
    pub fn refusing(mut self, message: impl Into<String>) -> Self {
        self.refuse_with = Some(message.into());
        self
    }

    /// Returns the session counters.
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            opened: self.counters.opened.load(Ordering::SeqCst),
            closed: self.counters.closed.load(Ordering::SeqCst),
            live: self.counters.live.load(Ordering::SeqCst),
            max_live: self.counters.max_live.load(Ordering::SeqCst),
        }
    }

    /// Returns every SQL text executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        if let Some(reason) = &self.refuse_with {
            return Err(SqlRunError::connection(reason.clone()));
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(MockDatabaseClient {
            responses: Arc::clone(&self.responses),
            counters: Arc::clone(&self.counters),
            executed: Arc::clone(&self.executed),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A mock session that answers from its connector's script.
///
/// Unscripted `SELECT`s return a single mock row; anything else returns an
/// empty result.
#[derive(Debug)]
pub struct MockDatabaseClient {
    responses: Arc<HashMap<String, MockResponse>>,
    counters: Arc<SessionCounters>,
    executed: Arc<Mutex<Vec<String>>>,
    closed: AtomicBool,
}

impl MockDatabaseClient {
    /// Creates a standalone client with no script.
    pub fn new() -> Self {
        Self {
            responses: Arc::default(),
            counters: Arc::default(),
            executed: Arc::default(),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SqlRunError::connection("connection already closed"));
        }

        self.executed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sql.to_string());

        match self.responses.get(&key(sql)) {
            Some(MockResponse::Rows(result)) => Ok(result.clone()),
            Some(MockResponse::Error(message)) => Err(SqlRunError::query(message.clone())),
            None if sql.trim_start().to_uppercase().starts_with("SELECT") => {
                let columns = vec![ColumnInfo::new("result", "text")];
                let rows = vec![vec![Value::String(format!("Mock result for: {}", sql.trim()))]];
                Ok(QueryResult::with_data(columns, rows)
                    .with_execution_time(Duration::from_millis(1)))
            }
            None => Ok(QueryResult::new().with_execution_time(Duration::from_millis(1))),
        }
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn key(sql: &str) -> String {
    sql.trim().to_string()
}

//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, Connector, DatabaseClient, QueryResult, Row, Value};
use crate::error::{Result, SqlRunError};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column as SqlxColumn, Connection, Either, Row as SqlxRow, TypeInfo};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

/// PostgreSQL database client.
///
/// Holds exactly one session. `close` takes it out, after which queries are
/// rejected.
#[derive(Debug)]
pub struct PostgresClient {
    conn: Mutex<Option<PgConnection>>,
}

impl PostgresClient {
    /// Opens one session. A single attempt is made; no retries.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = config.to_connect_options()?;

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Opened session to {}", config.display_string());
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }
}

/// Runs the text through the simple query protocol and returns the rows of
/// the final statement, which may be empty.
async fn fetch_last_result_set(
    conn: &mut PgConnection,
    sql: &str,
) -> std::result::Result<Vec<PgRow>, sqlx::Error> {
    let mut stream = sqlx::raw_sql(sql).fetch_many(conn);
    let mut sets = ResultSets::default();

    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => {
                debug!("Statement finished ({} rows affected)", done.rows_affected());
                sets.finish_statement();
            }
            Either::Right(row) => sets.push_row(row),
        }
    }

    Ok(sets.into_last())
}

/// Rows of the statement being streamed and of the last finished one.
#[derive(Debug)]
struct ResultSets<R> {
    current: Vec<R>,
    last: Vec<R>,
}

impl<R> Default for ResultSets<R> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            last: Vec::new(),
        }
    }
}

impl<R> ResultSets<R> {
    fn push_row(&mut self, row: R) {
        self.current.push(row);
    }

    /// The statement that just finished replaces the previous one, rows or not.
    fn finish_statement(&mut self) {
        self.last = std::mem::take(&mut self.current);
    }

    fn into_last(self) -> Vec<R> {
        if self.current.is_empty() {
            self.last
        } else {
            self.current
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| SqlRunError::connection("connection already closed"))?;

        let start = Instant::now();

        let pg_rows = fetch_last_result_set(conn, sql)
            .await
            .map_err(|e| SqlRunError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        // Column metadata is only available through a returned row.
        let columns: Vec<ColumnInfo> = pg_rows
            .first()
            .map(|first_row| {
                first_row
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Row> = pg_rows.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.close()
                .await
                .map_err(|e| SqlRunError::connection(format!("Failed to close session: {e}")))?;
        }
        Ok(())
    }
}

/// Connector that opens `PostgresClient` sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        let client = PostgresClient::connect(config).await?;
        Ok(Box::new(client))
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// The simple query protocol returns every value in text format, so types
/// without a dedicated arm keep the server's own text rendering (`t`/`f` for
/// booleans).
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // Booleans, floats, numerics, dates, json, enums...: keep the text as sent.
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Maps sqlx connection errors to user-friendly messages that keep the cause.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> SqlRunError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    let hint = if error_str.contains("connection refused") || error_str.contains("could not connect")
    {
        format!("Cannot connect to {host}:{port}. Check that the server is running.")
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        format!("Authentication failed for user '{user}'. Check your credentials.")
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        format!("Database '{database}' does not exist.")
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        format!("Connection to {host}:{port} timed out.")
    } else {
        return SqlRunError::connection(error.to_string());
    };

    SqlRunError::connection(format!("{hint} ({error})"))
}

/// Formats a query error with PostgreSQL detail fields if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }

        if let Some(constraint) = pg_error.constraint() {
            result.push_str("\n  CONSTRAINT: ");
            result.push_str(constraint);
        }
    }

    result
}

//! File-based query runner: executes every SQL file and reports on the console.

use std::path::Path;

use tracing::debug;

use crate::connection::ConnectionProvider;
use crate::db::Row;
use crate::error::Result;
use crate::query::{discover_sql_files, QueryExecutor, QueryUnit, UnitOutcome};
use crate::report::{BatchEvent, BatchMode, BatchSummary, Reporter};

/// Runs a directory of SQL files one after another.
pub struct QueryRunner<'a> {
    executor: QueryExecutor<'a>,
    sample_rows: usize,
}

impl<'a> QueryRunner<'a> {
    /// Creates a runner printing up to `sample_rows` rows per result.
    pub fn new(provider: &'a ConnectionProvider, sample_rows: usize) -> Self {
        Self {
            executor: QueryExecutor::new(provider),
            sample_rows,
        }
    }

    /// Executes every `.sql` file in `sql_dir` in file-name order.
    ///
    /// A file that cannot be read aborts the batch with an error. Connection
    /// and query failures only mark that file as failed.
    pub async fn run_all(&self, sql_dir: &Path, reporter: &mut dyn Reporter) -> Result<BatchSummary> {
        let files = discover_sql_files(sql_dir).await?;
        reporter.report(BatchEvent::BatchStarted {
            mode: BatchMode::Run,
            directory: sql_dir.to_path_buf(),
            unit_count: files.len(),
        });

        let mut summary = BatchSummary::default();

        for path in files {
            let unit = QueryUnit::load(&path).await?;
            reporter.report(BatchEvent::UnitStarted {
                mode: BatchMode::Run,
                file: unit.file_name.clone(),
            });

            let outcome = self.executor.execute(&unit, reporter).await;
            summary.processed += 1;

            match outcome {
                UnitOutcome::Rows(result) => {
                    debug!(file = %unit.file_name, "Query took {:?}", result.execution_time);
                    summary.succeeded += 1;
                    reporter.report(BatchEvent::RowsReturned {
                        file: unit.file_name.clone(),
                        row_count: result.row_count,
                    });
                    reporter.report(BatchEvent::SampleRows {
                        file: unit.file_name.clone(),
                        rows: result
                            .rows
                            .iter()
                            .take(self.sample_rows)
                            .map(format_sample_row)
                            .collect(),
                    });
                }
                other => {
                    if other.is_failure() {
                        summary.failed += 1;
                    } else {
                        summary.empty += 1;
                    }
                    reporter.report(BatchEvent::NoResults {
                        mode: BatchMode::Run,
                        file: unit.file_name.clone(),
                    });
                }
            }
        }

        reporter.report(BatchEvent::BatchFinished {
            mode: BatchMode::Run,
            summary,
        });
        Ok(summary)
    }
}

/// Formats a row as a parenthesized, comma-separated tuple.
fn format_sample_row(row: &Row) -> String {
    let cells: Vec<String> = row.iter().map(|v| v.to_display_string()).collect();
    format!("({})", cells.join(", "))
}

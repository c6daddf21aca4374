//! Tabular exporter: one CSV artifact per SQL file.

pub mod csv;

use std::path::Path;

use crate::connection::ConnectionProvider;
use crate::error::{Result, SqlRunError};
use crate::query::{discover_sql_files, QueryExecutor, QueryUnit, UnitOutcome};
use crate::report::{BatchEvent, BatchMode, BatchSummary, Reporter};

/// Executes a directory of SQL files and writes each result set to CSV.
pub struct Exporter<'a> {
    executor: QueryExecutor<'a>,
}

impl<'a> Exporter<'a> {
    /// Creates an exporter using sessions from `provider`.
    pub fn new(provider: &'a ConnectionProvider) -> Self {
        Self {
            executor: QueryExecutor::new(provider),
        }
    }

    /// Exports every `.sql` file in `sql_dir` to `<stem>.csv` in `output_dir`.
    ///
    /// The output directory is created if needed. Files whose query fails or
    /// returns no rows get no artifact. An unreadable input file, or an output
    /// that cannot be created or written, aborts the batch.
    pub async fn export_all(
        &self,
        sql_dir: &Path,
        output_dir: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<BatchSummary> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| SqlRunError::io(output_dir, e))?;

        let files = discover_sql_files(sql_dir).await?;
        reporter.report(BatchEvent::BatchStarted {
            mode: BatchMode::Export,
            directory: sql_dir.to_path_buf(),
            unit_count: files.len(),
        });

        let mut summary = BatchSummary::default();

        for path in files {
            let unit = QueryUnit::load(&path).await?;
            reporter.report(BatchEvent::UnitStarted {
                mode: BatchMode::Export,
                file: unit.file_name.clone(),
            });

            let outcome = self.executor.execute(&unit, reporter).await;
            summary.processed += 1;

            match outcome {
                UnitOutcome::Rows(result) => {
                    let target = output_dir.join(unit.csv_file_name());
                    csv::write_csv(&target, &result).await?;

                    summary.succeeded += 1;
                    summary.exported += 1;
                    reporter.report(BatchEvent::Exported {
                        file: unit.file_name.clone(),
                        path: target,
                        row_count: result.row_count,
                    });
                }
                other => {
                    if other.is_failure() {
                        summary.failed += 1;
                    } else {
                        summary.empty += 1;
                    }
                    reporter.report(BatchEvent::NoResults {
                        mode: BatchMode::Export,
                        file: unit.file_name.clone(),
                    });
                }
            }
        }

        reporter.report(BatchEvent::BatchFinished {
            mode: BatchMode::Export,
            summary,
        });
        Ok(summary)
    }
}

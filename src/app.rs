//! Wiring between the command line, the configuration file and the batches.

use std::path::PathBuf;

use crate::cli::{Cli, Command};
use crate::config::{Config, ConnectionConfig, PathsConfig};
use crate::connection::ConnectionProvider;
use crate::error::{Result, SqlRunError};
use crate::export::Exporter;
use crate::query::QueryRunner;
use crate::report::{BatchSummary, Reporter};

/// Resolves the connection parameters with precedence:
/// 1. CLI arguments (highest)
/// 2. Named connection from config
/// 3. Default connection from config
/// 4. Environment variables
///
/// The result must name a database.
pub fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionConfig> {
    let mut connection = cli.to_connection_config()?;

    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(SqlRunError::config(format!(
                    "Connection '{}' not found in config file",
                    name
                )));
            }
        }
    }

    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    let mut connection = connection.unwrap_or_default();
    connection.apply_env_defaults();
    connection.validate()?;

    Ok(connection)
}

/// Resolves the SQL and output folders: subcommand flags win over `[paths]`.
pub fn resolve_paths(command: &Command, config: &Config) -> PathsConfig {
    let pick = |flag: &Option<PathBuf>, fallback: &PathBuf| {
        flag.clone().unwrap_or_else(|| fallback.clone())
    };

    match command {
        Command::Run(args) => PathsConfig {
            sql_dir: pick(&args.sql_dir, &config.paths.sql_dir),
            output_dir: config.paths.output_dir.clone(),
        },
        Command::Export(args) => PathsConfig {
            sql_dir: pick(&args.sql_dir, &config.paths.sql_dir),
            output_dir: pick(&args.output_dir, &config.paths.output_dir),
        },
    }
}

/// Runs the selected batch to completion.
pub async fn run_command(
    command: &Command,
    paths: &PathsConfig,
    provider: &ConnectionProvider,
    reporter: &mut dyn Reporter,
) -> Result<BatchSummary> {
    match command {
        Command::Run(args) => {
            QueryRunner::new(provider, args.sample_rows)
                .run_all(&paths.sql_dir, reporter)
                .await
        }
        Command::Export(_) => {
            Exporter::new(provider)
                .export_all(&paths.sql_dir, &paths.output_dir, reporter)
                .await
        }
    }
}

//! sqlrun - run a folder of SQL files against PostgreSQL and export the results.

use anyhow::Context;
use sqlrun::app;
use sqlrun::cli::{Cli, Command};
use sqlrun::config::Config;
use sqlrun::connection::ConnectionProvider;
use sqlrun::error::SqlRunError;
use sqlrun::logging;
use sqlrun::report::ConsoleReporter;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Credentials may live in a local .env file.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: could not load .env: {e}");
        }
    }

    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => {
            if let Err(e) = logging::init_file_logging(path) {
                eprintln!("Warning: {e}; logging to stderr");
                logging::init_stderr_logging();
            }
        }
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<SqlRunError>() {
            Some(err) => error!("{}: {:#}", err.category(), e),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let connection = app::resolve_connection(&cli, &config)?;
    info!("Connection: {}", connection.display_string());

    let paths = app::resolve_paths(&cli.command, &config);
    let provider = ConnectionProvider::postgres(connection);
    let mut reporter = ConsoleReporter::stdout();

    let batch = match cli.command {
        Command::Run(_) => "run",
        Command::Export(_) => "export",
    };

    app::run_command(&cli.command, &paths, &provider, &mut reporter)
        .await
        .with_context(|| format!("{batch} of {} aborted", paths.sql_dir.display()))?;

    Ok(())
}

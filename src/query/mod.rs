//! Query discovery, execution and the console runner.

pub mod executor;
pub mod runner;
pub mod unit;

pub use executor::{QueryExecutor, UnitOutcome};
pub use runner::QueryRunner;
pub use unit::{discover_sql_files, QueryUnit};

//! Integration tests for sqlrun.
//!
//! Database-backed tests skip themselves when DATABASE_URL is not set.

pub mod cli_test;
pub mod connection_test;
pub mod export_test;

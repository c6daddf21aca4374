//! sqlrun - run a folder of SQL files against PostgreSQL and export the results.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod query;
pub mod report;

//! Connection management for sqlrun.
//!
//! Centralizes how sessions are opened for each query unit.

pub mod provider;

pub use provider::ConnectionProvider;

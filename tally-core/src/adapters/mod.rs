//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Store port and the read-side queries
//! - An in-memory store for unit tests

pub mod duckdb;

#[cfg(test)]
pub mod memory;

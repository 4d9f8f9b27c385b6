pub mod backend;
pub mod metadata_impl;
pub mod queries;
pub mod schema;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `better_analytics_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;

pub mod analytics;
pub mod config;
pub mod error;
pub mod filter;
pub mod funnel;
pub mod journey;
pub mod safe_sql;

/// Re-export `Config` from `better-analytics-core` for use within this crate.
///
/// Environment parsing lives in core so integration tests can build a
/// `Config` without starting the server.
pub use better_analytics_core::config::Config;

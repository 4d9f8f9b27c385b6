pub mod app;
pub mod config;
pub mod error;
pub mod preview;
pub mod routes;
pub mod state;

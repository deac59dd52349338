pub mod actions;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

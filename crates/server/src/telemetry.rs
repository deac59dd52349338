//! Tracing subscriber setup.
//!
//! The filter comes from `RUST_LOG` when set, otherwise `info` (or `debug`
//! when the hub runs in debug mode).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Used by workers, whose stdout carries the response line.
    Stderr,
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

/// Install the global subscriber.
pub fn init(debug: bool, target: LogTarget) {
    let registry = tracing_subscriber::registry().with(env_filter(debug));
    match target {
        LogTarget::Stdout => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogTarget::Stderr => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    if debug {
        tracing::debug!("Debug Mode");
    }
}

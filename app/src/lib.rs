//! Kick multi-channel chat viewer core.
//!
//! The UI thread owns the terminal and the image caches' read side. A
//! scheduler thread (see [`runtime`]) owns every network task. The two meet
//! at the orchestrator command channel and the event delivery queue.

pub mod config;
pub mod events;
pub mod orchestrator;
pub mod render;
pub mod runtime;
pub mod services;
pub mod session;
pub mod ui;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

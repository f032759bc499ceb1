use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ShutdownMessage {
    // only used in initialize.
    Init,
    Cancel(String),
}

/// Installs a global `tracing` subscriber. `RUST_LOG` wins when set;
/// otherwise falls back to `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

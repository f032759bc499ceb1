use thiserror::Error;

/// Fatal errors that abort startup before the accept loop runs. These are
/// the only variants that ever reach `main` and set the process exit code.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("backing store unreachable at startup: {0}")]
    BackingStoreUnreachable(#[source] StoreError),

    #[error("failed to bind listener on port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced by the backing-store client. Callers never propagate
/// these to the MySQL client; the rate limiter fails open and the executor
/// degrades the current query to an empty result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store transport error: {0}")]
    Transport(#[from] redis::RedisError),

    #[error("backing store operation timed out")]
    Timeout,

    #[error("connection pool exhausted or unavailable: {0}")]
    Pool(String),
}

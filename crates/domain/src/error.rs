/// Shared error type used across all congress-mirror crates.
///
/// Only run-fatal conditions travel as `Error`: item-level failures
/// (validation rejections, per-item store rejections) are outcome values
/// handled where they occur, and transient upstream failures are retried
/// before they ever surface here.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("store table '{0}' missing")]
    TableMissing(String),

    #[error("store: {0}")]
    Store(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must abort the whole run rather than a single
    /// window or item.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Auth(_) | Error::TableMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Errors surfaced by the crate.
///
/// Operations that are idempotent by contract (dismissing an unknown
/// notification, closing a closed dialog) never produce one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// The user-supplied save function failed on the forced or flush path.
    #[error("save failed: {0:#}")]
    Save(anyhow::Error),
    /// The draft store could not hand back a stashed draft.
    #[error("draft storage failed: {0:#}")]
    Draft(anyhow::Error),
    /// A controller that needs timers was built outside a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

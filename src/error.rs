use std::io;

use thiserror::Error;

/// Error type shared by the loader, the search pipeline and the login gate.
///
/// `DataUnavailable`, `UnknownColumn` and `Config` are fatal: the server refuses to
/// start and the CLI exits. `InvalidCredential` and `NotFound` are recoverable and
/// are shown to the user as text or an empty detail panel.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("data source '{origin}' is unavailable: {reason}")]
    DataUnavailable { origin: String, reason: String },
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("invalid ID or password")]
    InvalidCredential,
    #[error("no row in '{table}' with key '{key}'")]
    NotFound { table: String, key: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SearchError {
    pub fn unavailable(origin: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        SearchError::DataUnavailable {
            origin: origin.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that must halt rendering instead of being shown inline.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SearchError::DataUnavailable { .. }
                | SearchError::UnknownColumn { .. }
                | SearchError::Config(_)
                | SearchError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

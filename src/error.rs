//! Error taxonomy for a push run.
//!
//! Only [`PushError::ConfigMissing`] ends a run early. Transport and
//! no-effect failures belong to a single document: they are written to the
//! change log and the run moves on to the next record.

use thiserror::Error;

/// Result type for catalog calls.
pub type CatalogResult<T> = std::result::Result<T, PushError>;

#[derive(Error, Debug)]
pub enum PushError {
    /// Configuration file missing, unreadable, or rejected by validation.
    #[error("configuration error: {0}")]
    ConfigMissing(String),

    /// Connection failure, timeout, or non-2xx status from the catalog.
    #[error("transport error: {0}")]
    Transport(String),

    /// The catalog answered, but reported anything other than exactly one
    /// affected record.
    #[error("catalog reported no effect: {0}")]
    NoEffect(String),
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        PushError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_kind() {
        let err = PushError::NoEffect("totalInserted=0".into());
        assert_eq!(err.to_string(), "catalog reported no effect: totalInserted=0");
    }
}

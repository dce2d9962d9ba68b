//! Provider start-up errors.

use chrono::TimeDelta;

use crate::storage::StorageError;

/// A precondition that prevented a provider from starting.
///
/// When `start()` returns one of these, the provider has emitted nothing.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// No async runtime to schedule the fetch job on
    #[error("no tokio runtime available to schedule fetches")]
    NoRuntime,

    /// Repeating polls need a non-zero interval
    #[error("poll interval must be greater than zero")]
    InvalidPollInterval,

    /// The key-value store cannot be used at all
    #[error("local storage not available")]
    StorageUnavailable,

    /// No snapshot has ever been written
    #[error("local storage data has not been initialized")]
    NotInitialized,

    /// The snapshot is older than the freshness threshold
    #[error(
        "local storage data is obsolete: {}s old, threshold {}s",
        .age.num_seconds(),
        .threshold.num_seconds()
    )]
    Stale { age: TimeDelta, threshold: TimeDelta },

    /// The snapshot exists but cannot be decoded
    #[error("local storage data is corrupt ({key}): {message}")]
    CorruptSnapshot { key: &'static str, message: String },

    /// Reading the store failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            StartError::NotInitialized.to_string(),
            "local storage data has not been initialized"
        );

        let err = StartError::Stale {
            age: TimeDelta::seconds(7200),
            threshold: TimeDelta::seconds(3600),
        };
        assert_eq!(
            err.to_string(),
            "local storage data is obsolete: 7200s old, threshold 3600s"
        );

        let err = StartError::CorruptSnapshot {
            key: "stations",
            message: "expected value".into(),
        };
        assert_eq!(
            err.to_string(),
            "local storage data is corrupt (stations): expected value"
        );
    }
}

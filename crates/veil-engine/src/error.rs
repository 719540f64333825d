use thiserror::Error;
use veil_store::StoreError;

/// Errors produced by the engine.
///
/// Admission outcomes (stale roots, replays, double signals) are not errors;
/// they are returned as [`crate::Admission`] variants.  This enum covers
/// registry misuse and storage-engine faults only.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Registration of a commitment that is already in the identity set.
    #[error("Identity commitment already registered: {0}")]
    DuplicateCommitment(String),

    /// Removal of a commitment that is not in the identity set.
    #[error("Identity commitment not registered: {0}")]
    UnknownCommitment(String),

    /// Storage engine failure.  Fatal to the request; never swallowed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

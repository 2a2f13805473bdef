//! Error kinds shared across every reconcile crate.
//!
//! One enum per spec.md §7. Each library crate returns `Result<T,
//! ReconcileError>` from its public API; only the CLI binary wraps these in
//! `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("dictionary collision: hash {hash} already maps to a different entry")]
    Collision { hash: u64 },

    #[error("IBLT decode failed after exhausting retries")]
    DecodeFailed,

    #[error("reconciliation parameters differ between peers: {0}")]
    DecodeParameterMismatch(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("count mismatch: expected {expected}, found {found}")]
    CountMismatch { expected: u16, found: u16 },

    #[error("value {value} is out of range [{min}, {max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported type for conversion: {0}")]
    UnsupportedType(String),

    #[error("session failed: {0}")]
    SessionFailed(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

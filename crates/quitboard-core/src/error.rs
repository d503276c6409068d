//! Core error types for quitboard-core.
//!
//! Four failure families with distinct handling policies:
//! - [`ValidationError`]: bad input, state unchanged, retry immediately
//! - [`PreconditionFailed`]: the world is not in the required shape, no mutation
//! - [`StateConflict`]: an action arrived in a wizard state that does not
//!   expect it; answered with guidance, never a crash
//! - [`StoreError`] / [`TransportError`]: transient I/O; callers either keep
//!   retryable state intact or skip-and-log, depending on context

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::MemberId;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionFailed),

    #[error("state conflict: {0}")]
    StateConflict(#[from] StateConflict),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Malformed member input. Always safe to retry with corrected input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unrecognized date '{input}' (expected YYYY-MM-DD or DD.MM.YYYY)")]
    BadDate { input: String },

    #[error("cutoff date {date} lies in the future")]
    FutureDate { date: chrono::NaiveDate },

    #[error("unrecognized price '{input}'")]
    BadPrice { input: String },

    #[error("price must be non-negative, got {value}")]
    NegativePrice { value: f64 },
}

/// A required external condition does not hold. No state was mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionFailed {
    #[error("member {0} is already registered; reset first")]
    AlreadyRegistered(MemberId),

    #[error("member {0} does not hold active standing in the group")]
    NotGroupMember(MemberId),
}

/// A wizard step arrived out of order. Treated as a no-op with guidance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateConflict {
    #[error("member {0} has no registration in progress")]
    NoWizard(MemberId),

    #[error("member {0} has not selected a cutoff date yet")]
    NoPendingDate(MemberId),
}

/// Member store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("database is locked")]
    Locked,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(e.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Chat transport failures, labelled by operation.
///
/// Best-effort call sites (message retirement, badge updates) log and
/// discard these; commit paths surface them so retryable wizard state
/// stays intact.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("edit failed: {0}")]
    Edit(String),

    #[error("membership query failed: {0}")]
    Membership(String),

    #[error("privilege grant failed: {0}")]
    Grant(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("post time {hour:02}:{minute:02} is out of range")]
    InvalidPostTime { hour: u32, minute: u32 },
}

/// Result type alias for EngineError.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

//! Error taxonomy shared by ingestion and labeling.
//!
//! Ingestion catches these per document (or per QnA entry) and records them
//! in the [`IngestReport`](crate::ingest::IngestReport); the labeling
//! operations return them to the caller unchanged.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Filename does not match `<prefix><YYYYMMDD>.<ext>` or the digits are
    /// not a calendar date.
    #[error("malformed filename '{filename}': {reason}")]
    MalformedFilename { filename: String, reason: String },

    #[error("unreadable source file '{filename}': {reason}")]
    UnreadableSource { filename: String, reason: String },

    /// Source record is missing a required field or has an empty one.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("qna item not found: {0}")]
    NotFound(i64),

    /// Raised only when relabeling is disabled by policy.
    #[error("qna item {id} was already labeled by '{labeled_by}'")]
    AlreadyLabeled { id: i64, labeled_by: String },

    #[error("invalid actor id: {0}")]
    InvalidActor(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

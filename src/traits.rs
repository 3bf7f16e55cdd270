//! Extension trait for transcript sources.
//!
//! The ingestion pipeline never reads the filesystem directly; it asks a
//! [`SourceConnector`] for raw files. [`FilesystemConnector`] is the
//! built-in implementation, and tests or custom binaries can supply their
//! own (an in-memory list, an object store, ...).
//!
//! ```text
//!  SourceConnector::scan()  ──▶  ingest_sources()  ──▶  SQLite
//!  (filename + body)             parse, validate,       documents
//!                                insert per document    qna_items
//! ```
//!
//! [`FilesystemConnector`]: crate::connector_fs::FilesystemConnector

use anyhow::Result;
use async_trait::async_trait;

use crate::models::SourceFile;

/// A source of transcript files.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use qna_labeler::models::SourceFile;
/// use qna_labeler::traits::SourceConnector;
///
/// pub struct StaticConnector(Vec<SourceFile>);
///
/// #[async_trait]
/// impl SourceConnector for StaticConnector {
///     fn name(&self) -> &str { "static" }
///
///     async fn scan(&self) -> Result<Vec<SourceFile>> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Short label used in logs and progress output.
    fn name(&self) -> &str;

    /// Returns every file to consider for ingestion.
    ///
    /// An error here aborts the run before anything is written. A single
    /// unreadable file should be logged and left out instead.
    async fn scan(&self) -> Result<Vec<SourceFile>>;
}

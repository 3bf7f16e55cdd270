//! Ingestion pipeline orchestration.
//!
//! Coordinates the batch flow: connector → filename date → record parsing →
//! one transaction per document. Every per-document problem is captured in
//! that document's [`IngestOutcome`]; only a failing connector scan aborts
//! the run. Re-running over the same files is a no-op because documents are
//! keyed on their filename.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::config::Config;
use crate::connector_fs::FilesystemConnector;
use crate::db;
use crate::error::Error;
use crate::migrate;
use crate::models::SourceFile;
use crate::progress::{IngestProgressEvent, IngestProgressReporter, ProgressMode};
use crate::record::{parse_filename_date, parse_record, ParsedRecord};
use crate::traits::SourceConnector;

/// What happened to one source file.
#[derive(Debug)]
pub enum IngestOutcome {
    Inserted {
        document_id: i64,
        items: usize,
        skipped_entries: usize,
    },
    /// A document with this filename is already stored.
    Duplicate,
    /// Unreadable file, bad filename or bad record; nothing was written.
    Rejected(Error),
    /// The store refused the write; the document's transaction was rolled back.
    Failed(Error),
}

impl IngestOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            IngestOutcome::Inserted { .. } => "inserted",
            IngestOutcome::Duplicate => "duplicate",
            IngestOutcome::Rejected(_) => "rejected",
            IngestOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct DocumentResult {
    pub filename: String,
    pub outcome: IngestOutcome,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub connector: String,
    pub results: Vec<DocumentResult>,
}

impl IngestReport {
    pub fn scanned(&self) -> usize {
        self.results.len()
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, IngestOutcome::Inserted { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, IngestOutcome::Duplicate))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, IngestOutcome::Rejected(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, IngestOutcome::Failed(_)))
    }

    pub fn items_inserted(&self) -> usize {
        self.results
            .iter()
            .map(|r| match r.outcome {
                IngestOutcome::Inserted { items, .. } => items,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome_for(&self, filename: &str) -> Option<&IngestOutcome> {
        self.results
            .iter()
            .find(|r| r.filename == filename)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&IngestOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// CLI entry point for `qlab ingest`.
pub async fn run_ingest(
    config: &Config,
    dir: Option<PathBuf>,
    progress: Option<ProgressMode>,
) -> Result<()> {
    let root = dir
        .or_else(|| config.ingest.root.clone())
        .ok_or_else(|| anyhow::anyhow!("No source directory given and ingest.root is not set"))?;

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let connector = FilesystemConnector::new(&root, &config.ingest);
    let reporter = progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    let report = ingest_sources(&pool, &connector, reporter.as_ref()).await?;

    println!("ingest {} ({})", report.connector, root.display());
    println!("  scanned: {} files", report.scanned());
    println!("  inserted documents: {}", report.inserted());
    println!("  inserted qna items: {}", report.items_inserted());
    println!("  duplicates skipped: {}", report.duplicates());
    println!("  rejected: {}", report.rejected());
    println!("  failed: {}", report.failed());
    for result in &report.results {
        match &result.outcome {
            IngestOutcome::Rejected(e) | IngestOutcome::Failed(e) => {
                println!("    {} {}: {}", result.outcome.status(), result.filename, e);
            }
            _ => {}
        }
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Ingests everything a connector yields.
pub async fn ingest_sources(
    pool: &SqlitePool,
    connector: &dyn SourceConnector,
    reporter: &dyn IngestProgressReporter,
) -> Result<IngestReport> {
    reporter.report(IngestProgressEvent::Scanning {
        connector: connector.name().to_string(),
    });

    let files = connector.scan().await?;
    let total = files.len() as u64;

    let mut report = IngestReport {
        connector: connector.name().to_string(),
        results: Vec::with_capacity(files.len()),
    };

    for (i, file) in files.iter().enumerate() {
        let outcome = ingest_file(pool, file).await;

        reporter.report(IngestProgressEvent::Document {
            connector: connector.name().to_string(),
            n: i as u64 + 1,
            total,
            filename: file.filename.clone(),
            status: outcome.status(),
        });

        report.results.push(DocumentResult {
            filename: file.filename.clone(),
            outcome,
        });
    }

    Ok(report)
}

/// Ingests a single file. Never fails; the outcome carries any error.
pub async fn ingest_file(pool: &SqlitePool, file: &SourceFile) -> IngestOutcome {
    let filename = file.filename.as_str();

    if let Some(reason) = &file.read_error {
        return IngestOutcome::Rejected(Error::UnreadableSource {
            filename: filename.to_string(),
            reason: reason.clone(),
        });
    }

    let date = match parse_filename_date(filename) {
        Ok(date) => date,
        Err(e) => {
            tracing::warn!(filename, error = %e, "rejecting document");
            return IngestOutcome::Rejected(e);
        }
    };

    let record = match parse_record(&file.body) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(filename, error = %e, "rejecting document");
            return IngestOutcome::Rejected(e);
        }
    };

    for skipped in &record.skipped {
        tracing::warn!(
            filename,
            entry = skipped.position,
            reason = %skipped.reason,
            "skipping qna entry"
        );
    }

    match insert_document(pool, filename, date, &record).await {
        Ok(Some(document_id)) => {
            tracing::info!(
                filename,
                document_id,
                items = record.entries.len(),
                "inserted document"
            );
            IngestOutcome::Inserted {
                document_id,
                items: record.entries.len(),
                skipped_entries: record.skipped.len(),
            }
        }
        Ok(None) => {
            tracing::info!(filename, "document already ingested, skipping");
            IngestOutcome::Duplicate
        }
        Err(e) => {
            tracing::error!(filename, error = %e, "failed to insert document");
            IngestOutcome::Failed(e)
        }
    }
}

/// Inserts a document and its entries in one transaction. Returns `None`
/// when the filename is already present.
async fn insert_document(
    pool: &SqlitePool,
    filename: &str,
    date: NaiveDate,
    record: &ParsedRecord,
) -> Result<Option<i64>, Error> {
    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM documents WHERE filename = ?")
        .bind(filename)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Ok(None);
    }

    let now = chrono::Utc::now().timestamp();

    let inserted = sqlx::query(
        "INSERT INTO documents (date, filename, speaker, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(date.format("%Y-%m-%d").to_string())
    .bind(filename)
    .bind(&record.speaker)
    .bind(&record.content)
    .bind(now)
    .execute(&mut *tx)
    .await;

    let document_id = match inserted {
        Ok(result) => result.last_insert_rowid(),
        // Lost a race with a concurrent ingest of the same file
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    for entry in &record.entries {
        sqlx::query(
            r#"
            INSERT INTO qna_items (document_id, questioner, question, responder, response, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document_id)
        .bind(&entry.questioner)
        .bind(&entry.question)
        .bind(&entry.responder)
        .bind(&entry.response)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(Some(document_id))
}

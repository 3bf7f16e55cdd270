//! Schema creation and the destructive reset.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Source documents, one row per ingested file
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            filename TEXT NOT NULL UNIQUE,
            speaker TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Question/response pairs, the unit of labeling
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS qna_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            questioner TEXT NOT NULL,
            question TEXT NOT NULL,
            responder TEXT NOT NULL,
            response TEXT NOT NULL,
            is_labeled INTEGER NOT NULL DEFAULT 0,
            label INTEGER,
            labeled_by TEXT,
            labeled_at INTEGER,
            reserved_by TEXT,
            reserved_until INTEGER,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_qna_items_is_labeled ON qna_items(is_labeled, id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_qna_items_labeled_by ON qna_items(labeled_by)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_qna_items_document_id ON qna_items(document_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Drops both tables and recreates them empty. Every document and label is
/// lost; callers must only reach this on an explicit user request.
pub async fn reset_tables(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    // Items first, they reference documents
    sqlx::query("DROP TABLE IF EXISTS qna_items")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS documents")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    run_migrations(pool).await
}

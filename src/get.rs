//! Item retrieval by ID.
//!
//! Used by both `qlab get` and `GET /api/qna/{id}`.

use anyhow::Result as AnyResult;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::labeling::format_ts_iso;
use crate::models::{LabelState, QnaItem};

pub async fn get_item(pool: &SqlitePool, id: i64) -> Result<QnaItem> {
    let row = sqlx::query(
        r#"
        SELECT q.id, q.document_id, q.questioner, q.question, q.responder, q.response,
               q.is_labeled, q.label, q.labeled_by, q.labeled_at,
               d.date, d.filename
        FROM qna_items q
        JOIN documents d ON q.document_id = d.id
        WHERE q.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::NotFound(id))?;

    let is_labeled: bool = row.get("is_labeled");
    let label: Option<bool> = row.get("label");

    Ok(QnaItem {
        id: row.get("id"),
        document_id: row.get("document_id"),
        date: row.get("date"),
        filename: row.get("filename"),
        questioner: row.get("questioner"),
        question: row.get("question"),
        responder: row.get("responder"),
        response: row.get("response"),
        state: LabelState::from_columns(is_labeled, label),
        labeled_by: row.get("labeled_by"),
        labeled_at: row.get("labeled_at"),
    })
}

/// CLI entry point for `qlab get`.
pub async fn run_get(config: &Config, id: i64) -> AnyResult<()> {
    let pool = db::connect(config).await?;
    let item = get_item(&pool, id).await;
    pool.close().await;
    let item = item?;

    println!("--- QnA Item ---");
    println!("id:          {}", item.id);
    println!("document:    {} ({})", item.filename, item.date);
    println!("state:       {}", item.state.as_str());
    if let Some(ref by) = item.labeled_by {
        println!("labeled_by:  {}", by);
    }
    if let Some(at) = item.labeled_at {
        println!("labeled_at:  {}", format_ts_iso(at));
    }
    println!();

    println!("--- Question ({}) ---", item.questioner);
    println!("{}", item.question);
    println!();

    println!("--- Response ({}) ---", item.responder);
    println!("{}", item.response);

    Ok(())
}

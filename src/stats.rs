//! Labeling progress overview for `qlab stats`.
//!
//! Prints the overall labeled/unlabeled split, a per-actor leaderboard, and
//! optionally the counts for one actor.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::labeling;

struct ActorRow {
    actor: String,
    total: i64,
    relevant: i64,
    irrelevant: i64,
    last_labeled_at: Option<i64>,
}

pub async fn run_stats(config: &Config, actor: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&pool)
        .await?;
    let overall = labeling::overall_stats(&pool).await?;

    println!("QnA Labeling: Progress");
    println!("=======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Documents:   {}", total_docs);
    println!("  QnA items:   {}", overall.total);
    println!(
        "  Labeled:     {} / {} ({}%)",
        overall.labeled,
        overall.total,
        if overall.total > 0 {
            (overall.labeled * 100) / overall.total
        } else {
            0
        }
    );
    println!("  Unlabeled:   {}", overall.unlabeled);

    let rows = sqlx::query(
        r#"
        SELECT
            labeled_by,
            COUNT(*) AS total,
            SUM(CASE WHEN label = 1 THEN 1 ELSE 0 END) AS relevant,
            SUM(CASE WHEN label = 0 THEN 1 ELSE 0 END) AS irrelevant,
            MAX(labeled_at) AS last_labeled_at
        FROM qna_items
        WHERE is_labeled = 1 AND labeled_by IS NOT NULL
        GROUP BY labeled_by
        ORDER BY total DESC, labeled_by ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let actors: Vec<ActorRow> = rows
        .iter()
        .map(|row| ActorRow {
            actor: row.get("labeled_by"),
            total: row.get("total"),
            relevant: row.get("relevant"),
            irrelevant: row.get("irrelevant"),
            last_labeled_at: row.get("last_labeled_at"),
        })
        .collect();

    if !actors.is_empty() {
        println!();
        println!("  By actor:");
        println!(
            "  {:<24} {:>6} {:>9} {:>11}   {}",
            "ACTOR", "TOTAL", "RELEVANT", "IRRELEVANT", "LAST LABEL"
        );
        println!("  {}", "-".repeat(76));
        for a in &actors {
            let last = a
                .last_labeled_at
                .map(format_ts_relative)
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {:<24} {:>6} {:>9} {:>11}   {}",
                a.actor, a.total, a.relevant, a.irrelevant, last
            );
        }
    }

    if let Some(actor) = actor {
        let stats = labeling::stats(&pool, actor).await?;
        println!();
        println!("  You ({}):", actor.trim());
        println!("    total:      {}", stats.user.total);
        println!("    relevant:   {}", stats.user.relevant);
        println!("    irrelevant: {}", stats.user.irrelevant);
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return labeling::format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        labeling::format_ts_iso(ts)
    }
}

//! The fetch → label cycle and progress counts.
//!
//! Every call takes the pool explicitly and runs as one short unit of
//! work; there is no in-process state between calls. Coordination between
//! actors is left to SQLite:
//!
//! - [`fetch_next`] picks uniformly among eligible unlabeled items by
//!   drawing a random offset into the `(is_labeled, id)` index, so no full
//!   table shuffle is needed. With `labeling.reservation_secs > 0` the pick
//!   is also reserved to the actor in the same statement, and items held by
//!   another actor's unexpired reservation are not eligible.
//! - [`label`] writes state, actor, and timestamp in one transaction.
//!   Whether an already-labeled item may be labeled again is governed by
//!   `labeling.allow_relabel`; when allowed, the overwrite is logged with
//!   the previous actor and value.
//! - [`stats`] reads are not serialized against concurrent labels.

use anyhow::Result as AnyResult;
use rand::Rng;
use sqlx::{Row, SqlitePool};

use crate::config::{Config, LabelingConfig};
use crate::db;
use crate::error::{Error, Result};
use crate::models::{ActorStats, LabelOutcome, LabelState, NextItem, OverallStats, Stats};

/// Longest accepted actor identifier, in characters.
pub const MAX_ACTOR_LEN: usize = 64;

/// Random-offset picks can miss when the eligible set shrinks between the
/// count and the pick; after this many misses the first eligible row is used.
const RANDOM_PICK_ATTEMPTS: usize = 3;

/// Normalizes an actor identifier.
pub fn validate_actor(actor: &str) -> Result<String> {
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(Error::InvalidActor("actor id must not be empty".to_string()));
    }
    if actor.chars().count() > MAX_ACTOR_LEN {
        return Err(Error::InvalidActor(format!(
            "actor id must be at most {} characters",
            MAX_ACTOR_LEN
        )));
    }
    if actor.chars().any(char::is_control) {
        return Err(Error::InvalidActor(
            "actor id must not contain control characters".to_string(),
        ));
    }
    Ok(actor.to_string())
}

/// Returns a random unlabeled item, or `None` when nothing is available.
pub async fn fetch_next(
    pool: &SqlitePool,
    policy: &LabelingConfig,
    actor: &str,
) -> Result<Option<NextItem>> {
    let actor = validate_actor(actor)?;
    let reserving = policy.reservation_secs > 0;
    let now = chrono::Utc::now().timestamp();
    let until = reserving.then(|| {
        let ttl = i64::try_from(policy.reservation_secs).unwrap_or(i64::MAX);
        now.saturating_add(ttl)
    });

    if reserving {
        // One outstanding reservation per actor
        sqlx::query(
            "UPDATE qna_items SET reserved_by = NULL, reserved_until = NULL \
             WHERE reserved_by = ? AND is_labeled = 0",
        )
        .bind(&actor)
        .execute(pool)
        .await?;
    }

    for attempt in 0..=RANDOM_PICK_ATTEMPTS {
        let eligible = count_eligible(pool, reserving, &actor, now).await?;
        if eligible == 0 {
            return Ok(None);
        }

        let offset = if attempt == RANDOM_PICK_ATTEMPTS {
            0
        } else {
            rand::thread_rng().gen_range(0..eligible)
        };

        let picked = match until {
            Some(until) => reserve_at(pool, &actor, now, until, offset).await?,
            None => pick_at(pool, offset).await?,
        };

        if let Some(id) = picked {
            let mut item = load_next_item(pool, id).await?;
            item.reserved_until = until;
            return Ok(Some(item));
        }

        tracing::debug!(attempt, offset, eligible, "eligible set shrank, retrying pick");
    }

    Ok(None)
}

async fn count_eligible(pool: &SqlitePool, reserving: bool, actor: &str, now: i64) -> Result<i64> {
    let count: i64 = if reserving {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM qna_items WHERE is_labeled = 0 \
             AND (reserved_until IS NULL OR reserved_until <= ? OR reserved_by = ?)",
        )
        .bind(now)
        .bind(actor)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM qna_items WHERE is_labeled = 0")
            .fetch_one(pool)
            .await?
    };
    Ok(count)
}

async fn pick_at(pool: &SqlitePool, offset: i64) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM qna_items WHERE is_labeled = 0 ORDER BY id LIMIT 1 OFFSET ?",
    )
    .bind(offset)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Selects and reserves in a single statement so two actors cannot both
/// reserve the same row.
async fn reserve_at(
    pool: &SqlitePool,
    actor: &str,
    now: i64,
    until: i64,
    offset: i64,
) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE qna_items SET reserved_by = ?, reserved_until = ?
        WHERE id = (
            SELECT id FROM qna_items
            WHERE is_labeled = 0
              AND (reserved_until IS NULL OR reserved_until <= ? OR reserved_by = ?)
            ORDER BY id
            LIMIT 1 OFFSET ?
        )
        RETURNING id
        "#,
    )
    .bind(actor)
    .bind(until)
    .bind(now)
    .bind(actor)
    .bind(offset)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

async fn load_next_item(pool: &SqlitePool, id: i64) -> Result<NextItem> {
    let row = sqlx::query(
        r#"
        SELECT q.id, q.questioner, q.question, q.responder, q.response, d.date, d.filename
        FROM qna_items q
        JOIN documents d ON q.document_id = d.id
        WHERE q.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::NotFound(id))?;

    Ok(NextItem {
        id: row.get("id"),
        questioner: row.get("questioner"),
        question: row.get("question"),
        responder: row.get("responder"),
        response: row.get("response"),
        date: row.get("date"),
        filename: row.get("filename"),
        reserved_until: None,
    })
}

/// Records a label for `item_id` on behalf of `actor`.
pub async fn label(
    pool: &SqlitePool,
    policy: &LabelingConfig,
    item_id: i64,
    relevant: bool,
    actor: &str,
) -> Result<LabelOutcome> {
    let actor = validate_actor(actor)?;

    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    // No-op write: takes the write lock and reads the prior state under it
    let previous: Option<(bool, Option<bool>, Option<String>)> = sqlx::query_as(
        "UPDATE qna_items SET labeled_at = labeled_at WHERE id = ? \
         RETURNING is_labeled, label, labeled_by",
    )
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((was_labeled, prev_label, prev_by)) = previous else {
        return Err(Error::NotFound(item_id));
    };
    if was_labeled && !policy.allow_relabel {
        return Err(Error::AlreadyLabeled {
            id: item_id,
            labeled_by: prev_by.unwrap_or_default(),
        });
    }

    sqlx::query(
        r#"
        UPDATE qna_items
        SET is_labeled = 1, label = ?, labeled_by = ?, labeled_at = ?,
            reserved_by = NULL, reserved_until = NULL
        WHERE id = ?
        "#,
    )
    .bind(relevant)
    .bind(&actor)
    .bind(now)
    .bind(item_id)
    .execute(&mut *tx)
    .await?;

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM qna_items WHERE is_labeled = 0")
        .fetch_one(&mut *tx)
        .await?;
    let user_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM qna_items WHERE is_labeled = 1 AND labeled_by = ?",
    )
    .bind(&actor)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    if was_labeled {
        tracing::info!(
            item_id,
            previous_actor = prev_by.as_deref().unwrap_or(""),
            previous_state = LabelState::from_columns(true, prev_label).as_str(),
            new_actor = %actor,
            new_state = LabelState::from_label(relevant).as_str(),
            "relabeled item"
        );
    }

    Ok(LabelOutcome {
        success: true,
        remaining,
        user_count,
    })
}

/// Per-actor and overall labeling counts.
pub async fn stats(pool: &SqlitePool, actor: &str) -> Result<Stats> {
    let actor = validate_actor(actor)?;

    let user = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN label = 1 THEN 1 ELSE 0 END), 0) AS relevant,
            COALESCE(SUM(CASE WHEN label = 0 THEN 1 ELSE 0 END), 0) AS irrelevant
        FROM qna_items
        WHERE is_labeled = 1 AND labeled_by = ?
        "#,
    )
    .bind(&actor)
    .fetch_one(pool)
    .await?;

    Ok(Stats {
        user: ActorStats {
            total: user.get("total"),
            relevant: user.get("relevant"),
            irrelevant: user.get("irrelevant"),
        },
        overall: overall_stats(pool).await?,
    })
}

pub async fn overall_stats(pool: &SqlitePool) -> Result<OverallStats> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN is_labeled = 1 THEN 1 ELSE 0 END), 0) AS labeled,
            COALESCE(SUM(CASE WHEN is_labeled = 0 THEN 1 ELSE 0 END), 0) AS unlabeled
        FROM qna_items
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(OverallStats {
        total: row.get("total"),
        labeled: row.get("labeled"),
        unlabeled: row.get("unlabeled"),
    })
}

/// CLI entry point for `qlab next`.
pub async fn run_next(config: &Config, actor: &str) -> AnyResult<()> {
    let pool = db::connect(config).await?;
    let next = fetch_next(&pool, &config.labeling, actor).await;
    pool.close().await;

    match next? {
        Some(item) => {
            println!("--- QnA {} ---", item.id);
            println!("document:   {} ({})", item.filename, item.date);
            if let Some(until) = item.reserved_until {
                println!("reserved:   until {}", format_ts_iso(until));
            }
            println!();
            println!("[{}]", item.questioner);
            println!("{}", item.question);
            println!();
            println!("[{}]", item.responder);
            println!("{}", item.response);
        }
        None => println!("No unlabeled items available."),
    }
    Ok(())
}

/// CLI entry point for `qlab label`.
pub async fn run_label(config: &Config, item_id: i64, relevant: bool, actor: &str) -> AnyResult<()> {
    let pool = db::connect(config).await?;
    let outcome = label(&pool, &config.labeling, item_id, relevant, actor).await;
    pool.close().await;

    let outcome = outcome?;
    println!(
        "labeled {} as {}",
        item_id,
        LabelState::from_label(relevant).as_str()
    );
    println!("  remaining: {}", outcome.remaining);
    println!("  labeled by you: {}", outcome.user_count);
    Ok(())
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

//! Core data models shared by ingestion, labeling, and the HTTP layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw file produced by a connector before parsing.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Bare filename; this is what the uniqueness constraint is keyed on.
    pub filename: String,
    pub path: Option<PathBuf>,
    pub body: String,
    /// Set when the connector found the file but could not read it.
    pub read_error: Option<String>,
}

/// Labeling state of a single item, derived from the `is_labeled`/`label`
/// column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelState {
    Unlabeled,
    LabeledRelevant,
    LabeledIrrelevant,
}

impl LabelState {
    pub fn from_columns(is_labeled: bool, label: Option<bool>) -> Self {
        match (is_labeled, label) {
            (true, Some(true)) => LabelState::LabeledRelevant,
            (true, Some(false)) => LabelState::LabeledIrrelevant,
            // A labeled row with a NULL label cannot be written by `label()`;
            // treat it as not yet labeled.
            _ => LabelState::Unlabeled,
        }
    }

    pub fn from_label(relevant: bool) -> Self {
        if relevant {
            LabelState::LabeledRelevant
        } else {
            LabelState::LabeledIrrelevant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelState::Unlabeled => "unlabeled",
            LabelState::LabeledRelevant => "labeled-relevant",
            LabelState::LabeledIrrelevant => "labeled-irrelevant",
        }
    }
}

/// A question/response pair with its document context.
#[derive(Debug, Clone, Serialize)]
pub struct QnaItem {
    pub id: i64,
    pub document_id: i64,
    pub date: String,
    pub filename: String,
    pub questioner: String,
    pub question: String,
    pub responder: String,
    pub response: String,
    pub state: LabelState,
    pub labeled_by: Option<String>,
    pub labeled_at: Option<i64>,
}

/// The item handed to an actor by `fetch_next`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NextItem {
    pub id: i64,
    pub questioner: String,
    pub question: String,
    pub responder: String,
    pub response: String,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub filename: String,
    /// Unix seconds; present only when reservations are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_until: Option<i64>,
}

/// Counts returned after a successful `label` call.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LabelOutcome {
    pub success: bool,
    /// Items still unlabeled across the whole store.
    pub remaining: i64,
    /// Items labeled by the calling actor so far.
    pub user_count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ActorStats {
    pub total: i64,
    pub relevant: i64,
    pub irrelevant: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct OverallStats {
    pub total: i64,
    pub labeled: i64,
    pub unlabeled: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub user: ActorStats,
    pub overall: OverallStats,
}

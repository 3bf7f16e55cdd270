//! # QnA Labeler
//!
//! Ingests monetary-policy press-conference transcripts into SQLite and
//! serves a human relevance-labeling workflow over their question/answer
//! exchanges.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Connector  │──▶│    Ingest    │──▶│    SQLite     │
//! │ (directory) │   │ parse+insert │   │ documents     │
//! └─────────────┘   └──────────────┘   │ qna_items     │
//!                                      └──────┬────────┘
//!                      ┌──────────────────────┤
//!                      ▼                      ▼
//!                 ┌──────────┐          ┌──────────┐
//!                 │   CLI    │          │   HTTP   │
//!                 │  (qlab)  │          │  (axum)  │
//!                 └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qlab init                         # create database
//! qlab ingest ./Powell              # load transcripts (safe to re-run)
//! qlab next --actor alice           # show a random unlabeled pair
//! qlab label 42 relevant --actor alice
//! qlab stats --actor alice
//! qlab serve                        # JSON API for the labeling UI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`record`] | Source file and filename parsing |
//! | [`traits`] | Source connector trait |
//! | [`connector_fs`] | Directory connector |
//! | [`ingest`] | Batch ingestion |
//! | [`labeling`] | Fetch, label, and stats operations |
//! | [`get`] | Item lookup |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation and reset |

pub mod config;
pub mod connector_fs;
pub mod db;
pub mod error;
pub mod get;
pub mod ingest;
pub mod labeling;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod record;
pub mod server;
pub mod stats;
pub mod traits;

pub use error::{Error, Result};

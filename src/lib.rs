//! # Study Ledger Library
//!
//! An append-only daily activity ledger for a study app, with an HTTP API.
//!
//! ## Features
//!
//! - **Daily Ledger**: One SQLite row per user per calendar day, counters
//!   that only ever grow via atomic upsert-increments
//! - **Read Projections**: Full series, lifetime summary, 180-day heatmap
//!   window, monthly rollups, and practice-time windows
//! - **Teacher View**: Combined performance composition behind a
//!   link-based authorization gate
//! - **Configuration**: TOML-based configuration system with sensible defaults
//! - **Error Handling**: Unified error handling with automatic retries for
//!   transient database failures
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use study_ledger::ledger::ActivityLedger;
//! use study_ledger::models::ActivityDelta;
//! use std::path::Path;
//!
//! let ledger = ActivityLedger::new(Path::new("ledger.db")).unwrap();
//! ledger.record_quiz("student-1", 4, None, None).unwrap();
//! let summary = ledger.get_summary("student-1").unwrap();
//! assert_eq!(summary.total_quizzes, 1);
//! # let _ = ActivityDelta::default();
//! ```

pub mod common;
/// Configuration management module for loading and saving settings
pub mod config;
pub mod error;
/// SQLite-backed daily activity ledger
pub mod ledger;
/// Database schema migration system
pub mod migrations;
pub mod models;
/// Teacher-facing performance composition
pub mod performance;
/// Retry logic with exponential backoff for transient failures
pub mod retry;
/// Axum HTTP server and route handlers
pub mod server;
pub mod version;

pub use config::Config;
pub use error::{LedgerError, Result};
pub use ledger::ActivityLedger;
pub use performance::student_performance;
pub use server::{build_router, start_server, AppState};
pub use version::version_string;

//! The Activity Ledger: one row per `(user_id, date)`, counters that only
//! ever grow, and the read projections derived from them.
//!
//! Every write is a single `INSERT ... ON CONFLICT DO UPDATE SET
//! col = col + excluded.col` statement, so concurrent same-day writes for
//! the same user cannot lose updates. Rows are never deleted and no code
//! path writes to a date other than the server's current date.

use crate::common::{current_date, current_timestamp, window_start, HEATMAP_WINDOW_DAYS, WEEK_WINDOW_DAYS};
use crate::config::{self, CreditConfig};
use crate::error::{LedgerError, Result};
use crate::models::{ActivityDelta, ActivityRecord, ActivitySummary, MonthlyRollup, TimeWindows};
use crate::retry::{retry_if_retryable, RetryConfig};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SCHEMA: &str = r#"
-- Per-user per-day activity counters
CREATE TABLE IF NOT EXISTS daily_activity (
    user_id          TEXT NOT NULL,
    date             TEXT NOT NULL,
    ai_questions     INTEGER NOT NULL DEFAULT 0,
    quizzes_taken    INTEGER NOT NULL DEFAULT 0,
    correct_answers  INTEGER NOT NULL DEFAULT 0,
    practice_seconds INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, date)
);

-- Teacher-student links (authorization gate for cross-user reads)
CREATE TABLE IF NOT EXISTS student_links (
    student_id        TEXT PRIMARY KEY,
    teacher_id        TEXT NOT NULL,
    status            TEXT NOT NULL DEFAULT 'active',
    first_activity_at TEXT NOT NULL,
    last_updated_at   TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_daily_activity_date ON daily_activity(user_id, date DESC);
CREATE INDEX IF NOT EXISTS idx_student_links_teacher ON student_links(teacher_id);

-- Migration tracking table
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL,
    checksum TEXT NOT NULL,
    description TEXT,
    execution_time_ms INTEGER
);

-- Meta table for maintenance metadata
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Fixed practice-time credits granted per action.
///
/// Policy, not measurement: an AI reply or a quiz credits a flat number
/// of seconds no matter how long the student actually spent.
#[derive(Debug, Clone)]
pub struct CreditPolicy {
    /// Seconds credited for each AI tutor reply
    pub ai_reply_seconds: i64,
    /// Seconds credited for a quiz when no duration is supplied
    pub quiz_default_seconds: i64,
    /// Seconds credited per question when crediting by question count
    pub seconds_per_question: i64,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        CreditPolicy::from(&CreditConfig::default())
    }
}

impl From<&CreditConfig> for CreditPolicy {
    fn from(cfg: &CreditConfig) -> Self {
        CreditPolicy {
            ai_reply_seconds: cfg.ai_reply_seconds,
            quiz_default_seconds: cfg.quiz_default_seconds,
            seconds_per_question: cfg.seconds_per_question,
        }
    }
}

impl CreditPolicy {
    /// Seconds credited for a quiz of `questions` questions
    pub fn question_credit(&self, questions: i64) -> i64 {
        questions * self.seconds_per_question
    }
}

/// Handle to the SQLite-backed activity ledger.
///
/// Owns a connection pool; cheap to clone via `Arc` at the call sites
/// that need sharing. Constructed once and passed explicitly - there is
/// no global database handle.
pub struct ActivityLedger {
    #[allow(dead_code)]
    path: PathBuf,
    pool: Arc<Pool<SqliteConnectionManager>>,
    policy: CreditPolicy,
}

type DbConnection = PooledConnection<SqliteConnectionManager>;

impl ActivityLedger {
    /// Open (or create) the ledger database at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self> {
        Self::with_policy(db_path, CreditPolicy::from(&config::get_config().credit))
    }

    /// Open the ledger with an explicit credit policy (used by tests).
    pub fn with_policy(db_path: &Path, policy: CreditPolicy) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_config = &config::get_config().database;
        let busy_timeout_ms = db_config.busy_timeout_ms;

        // Create connection pool; WAL keeps concurrent request handling sane
        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "busy_timeout", busy_timeout_ms)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(db_config.max_connections)
            .build(manager)?;

        // Initialize schema using a connection from the pool
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        drop(conn);

        let ledger = Self {
            path: db_path.to_path_buf(),
            pool: Arc::new(pool),
            policy,
        };

        // Run any pending migrations (no-op for fresh databases)
        if let Err(e) = crate::migrations::run_migrations_on_db(db_path) {
            log::warn!("Failed to run automatic migrations: {}", e);
        }

        Ok(ledger)
    }

    /// The credit policy this ledger applies to fixed-credit writes
    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    fn get_connection(&self) -> Result<DbConnection> {
        let retry_config = RetryConfig::for_db_ops();
        retry_if_retryable(&retry_config, || Ok(self.pool.get()?))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Atomically add `delta` to the caller's counters for today.
    ///
    /// First write of the day inserts the deltas as initial values; later
    /// writes add to the stored values. One statement per call: either all
    /// four counters update together or none do.
    pub fn record_activity(&self, user_id: &str, delta: &ActivityDelta) -> Result<()> {
        let user_id = validate_user_id(user_id)?;
        self.record_activity_on(user_id, &current_date(), delta)
    }

    /// Dated upsert-increment. Only `record_activity` (with today's date)
    /// and tests reach this; rows for past days stay immutable in production.
    pub(crate) fn record_activity_on(
        &self,
        user_id: &str,
        date: &str,
        delta: &ActivityDelta,
    ) -> Result<()> {
        let retry_config = RetryConfig::for_db_ops();
        retry_if_retryable(&retry_config, || {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO daily_activity (
                    user_id, date, ai_questions, quizzes_taken, correct_answers, practice_seconds
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id, date) DO UPDATE SET
                    ai_questions = ai_questions + excluded.ai_questions,
                    quizzes_taken = quizzes_taken + excluded.quizzes_taken,
                    correct_answers = correct_answers + excluded.correct_answers,
                    practice_seconds = practice_seconds + excluded.practice_seconds",
                params![
                    user_id,
                    date,
                    delta.ai_questions,
                    delta.quizzes_taken,
                    delta.correct_answers,
                    delta.practice_seconds,
                ],
            )?;
            Ok(())
        })
    }

    /// Log a completed quiz.
    ///
    /// Credits one quiz, the given correct answers, and practice time in
    /// this order of preference: an explicit measured duration, the
    /// per-question credit for `questions`, or the flat quiz default.
    pub fn record_quiz(
        &self,
        user_id: &str,
        correct_answers: i64,
        practice_seconds: Option<i64>,
        questions: Option<i64>,
    ) -> Result<()> {
        let seconds = practice_seconds
            .or_else(|| questions.map(|q| self.policy.question_credit(q)))
            .unwrap_or(self.policy.quiz_default_seconds);

        self.record_activity(
            user_id,
            &ActivityDelta {
                quizzes_taken: 1,
                correct_answers,
                practice_seconds: seconds,
                ..ActivityDelta::default()
            },
        )
    }

    /// Log one AI tutor reply (one question asked, flat time credit).
    pub fn record_ai_reply(&self, user_id: &str) -> Result<()> {
        self.record_activity(
            user_id,
            &ActivityDelta {
                ai_questions: 1,
                practice_seconds: self.policy.ai_reply_seconds,
                ..ActivityDelta::default()
            },
        )
    }

    /// Log measured practice time (e.g. on session end).
    pub fn record_practice_time(&self, user_id: &str, seconds: i64) -> Result<()> {
        self.record_activity(
            user_id,
            &ActivityDelta {
                practice_seconds: seconds,
                ..ActivityDelta::default()
            },
        )
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Daily rows for a user, ascending by date.
    ///
    /// `lookback_days` limits the result to a trailing window ending today
    /// (inclusive); `None` returns the full history.
    pub fn get_series(&self, user_id: &str, lookback_days: Option<i64>) -> Result<Vec<ActivityRecord>> {
        let user_id = validate_user_id(user_id)?;
        let conn = self.get_connection()?;

        // Dates below the cutoff are excluded; an empty cutoff matches all rows
        let cutoff = lookback_days.map(window_start).unwrap_or_default();

        let mut stmt = conn.prepare(
            "SELECT date, ai_questions, quizzes_taken, correct_answers, practice_seconds
             FROM daily_activity
             WHERE user_id = ?1 AND date >= ?2
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![user_id, cutoff], |row| {
            Ok(ActivityRecord {
                date: row.get(0)?,
                ai_questions: row.get(1)?,
                quizzes_taken: row.get(2)?,
                correct_answers: row.get(3)?,
                practice_seconds: row.get(4)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }

        Ok(records)
    }

    /// Aggregate totals across all history, zeros when the user has no rows.
    pub fn get_summary(&self, user_id: &str) -> Result<ActivitySummary> {
        let user_id = validate_user_id(user_id)?;
        let conn = self.get_connection()?;

        // total_questions deliberately mirrors the correct-answers sum;
        // the backend has never tracked questions asked separately
        let summary = conn.query_row(
            "SELECT
                COALESCE(SUM(ai_questions), 0),
                COALESCE(SUM(quizzes_taken), 0),
                COALESCE(SUM(correct_answers), 0),
                COALESCE(SUM(practice_seconds), 0),
                MAX(date)
             FROM daily_activity
             WHERE user_id = ?1",
            params![user_id],
            |row| {
                let total_correct: i64 = row.get(2)?;
                Ok(ActivitySummary {
                    total_ai: row.get(0)?,
                    total_quizzes: row.get(1)?,
                    total_correct,
                    total_questions: total_correct,
                    total_seconds: row.get(3)?,
                    last_active: row.get(4)?,
                })
            },
        )?;

        Ok(summary)
    }

    /// Daily rows from the trailing 180 days (today inclusive), ascending.
    ///
    /// Days with no activity have no row; the heatmap renderer synthesizes
    /// the zeros.
    pub fn get_heatmap_window(&self, user_id: &str) -> Result<Vec<ActivityRecord>> {
        self.get_series(user_id, Some(HEATMAP_WINDOW_DAYS))
    }

    /// Per-month summed counters, ascending chronologically.
    ///
    /// Months with zero activity are absent (no gap-filling).
    pub fn get_monthly_rollup(&self, user_id: &str) -> Result<Vec<MonthlyRollup>> {
        let user_id = validate_user_id(user_id)?;
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            "SELECT
                substr(date, 1, 7) AS month,
                SUM(practice_seconds),
                SUM(ai_questions),
                SUM(quizzes_taken),
                SUM(correct_answers)
             FROM daily_activity
             WHERE user_id = ?1
             GROUP BY month
             ORDER BY month ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            let month_key: String = row.get(0)?;
            Ok((
                month_key,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut rollups = Vec::new();
        for row in rows {
            let (month_key, practice_seconds, ai_questions, quizzes_taken, correct_answers) = row?;
            let month_sort = crate::common::month_start(&month_key).ok_or_else(|| {
                LedgerError::other(format!("Malformed date bucket in ledger: {}", month_key))
            })?;
            rollups.push(MonthlyRollup {
                month: crate::common::month_label(&month_key),
                month_sort,
                practice_seconds,
                ai_questions,
                quizzes_taken,
                correct_answers,
            });
        }

        Ok(rollups)
    }

    /// Practice-seconds sums for today, the trailing week, and all time.
    pub fn get_time_windows(&self, user_id: &str) -> Result<TimeWindows> {
        let user_id = validate_user_id(user_id)?;
        let conn = self.get_connection()?;

        let today = current_date();
        let week_start = window_start(WEEK_WINDOW_DAYS);

        let windows = conn.query_row(
            "SELECT
                COALESCE(SUM(practice_seconds) FILTER (WHERE date = ?2), 0),
                COALESCE(SUM(practice_seconds) FILTER (WHERE date >= ?3), 0),
                COALESCE(SUM(practice_seconds), 0)
             FROM daily_activity
             WHERE user_id = ?1",
            params![user_id, today, week_start],
            |row| {
                Ok(TimeWindows {
                    today: row.get(0)?,
                    week: row.get(1)?,
                    overall: row.get(2)?,
                })
            },
        )?;

        Ok(windows)
    }

    // -----------------------------------------------------------------------
    // Teacher-student links
    // -----------------------------------------------------------------------

    /// Link a student to a teacher (called when the student enters a
    /// teacher code). Re-linking moves the student to the new teacher and
    /// leaves the link status untouched.
    pub fn connect_teacher(&self, student_id: &str, teacher_id: &str) -> Result<()> {
        let student_id = validate_field(student_id, "studentId")?;
        let teacher_id = validate_field(teacher_id, "teacherId")?;

        let retry_config = RetryConfig::for_db_ops();
        retry_if_retryable(&retry_config, || {
            let conn = self.pool.get()?;
            let now = current_timestamp();
            conn.execute(
                "INSERT INTO student_links (
                    student_id, teacher_id, status, first_activity_at, last_updated_at
                 )
                 VALUES (?1, ?2, 'active', ?3, ?3)
                 ON CONFLICT(student_id) DO UPDATE SET
                    teacher_id = excluded.teacher_id,
                    last_updated_at = excluded.last_updated_at",
                params![student_id, teacher_id, now],
            )?;
            Ok(())
        })
    }

    /// True when an active link exists between this teacher and student.
    pub fn has_active_link(&self, teacher_id: &str, student_id: &str) -> Result<bool> {
        let teacher_id = validate_field(teacher_id, "teacherId")?;
        let student_id = validate_field(student_id, "studentId")?;

        let conn = self.get_connection()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1
                 FROM student_links
                 WHERE teacher_id = ?1 AND student_id = ?2 AND status = 'active'
                 LIMIT 1",
                params![teacher_id, student_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// Check if the database is initialized and accessible
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.get_connection() {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok()
        } else {
            false
        }
    }
}

/// Reject blank user identifiers before touching storage.
fn validate_user_id(user_id: &str) -> Result<&str> {
    validate_field(user_id, "userId")
}

fn validate_field<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LedgerError::missing_field(name))
    } else {
        Ok(trimmed)
    }
}

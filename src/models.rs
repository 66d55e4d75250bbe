//! Data models for the Study Ledger.
//!
//! Request bodies are explicit structs with named optional fields and
//! documented defaults, validated once at the HTTP boundary. Wire field
//! names are camelCase to match the frontend's JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A partial set of counter increments for one write call.
///
/// Absent counters default to 0 and leave the stored value untouched
/// (adding zero). Every field is a delta, never an absolute value.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityDelta {
    /// AI tutor questions asked
    pub ai_questions: i64,
    /// Quizzes completed
    pub quizzes_taken: i64,
    /// Correct quiz answers
    pub correct_answers: i64,
    /// Practice time in seconds
    pub practice_seconds: i64,
}

impl ActivityDelta {
    /// True when every counter is zero (a no-op write)
    pub fn is_empty(&self) -> bool {
        self.ai_questions == 0
            && self.quizzes_taken == 0
            && self.correct_answers == 0
            && self.practice_seconds == 0
    }
}

/// One day of recorded activity for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Calendar date as a plain YYYY-MM-DD string (no time-of-day)
    pub date: String,
    pub ai_questions: i64,
    pub quizzes_taken: i64,
    pub correct_answers: i64,
    pub practice_seconds: i64,
}

/// Aggregate totals across a user's full history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub total_ai: i64,
    pub total_quizzes: i64,
    pub total_correct: i64,
    /// Mirrors `total_correct` (the backend has never tracked questions
    /// asked separately), so derived accuracy reads 100% wherever any
    /// correct answers exist.
    pub total_questions: i64,
    pub total_seconds: i64,
    /// Most recent date with any activity, if any
    pub last_active: Option<String>,
}

/// One calendar month of summed counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRollup {
    /// Human-readable label, e.g. "Jan 2024"
    pub month: String,
    /// Month start date, for chronological sorting
    pub month_sort: NaiveDate,
    pub practice_seconds: i64,
    pub ai_questions: i64,
    pub quizzes_taken: i64,
    pub correct_answers: i64,
}

/// Practice-seconds sums over the standard time windows.
///
/// Missing sums resolve to 0, never null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindows {
    /// Today's practice seconds
    pub today: i64,
    /// Trailing 7 days, today inclusive
    pub week: i64,
    /// All recorded history
    pub overall: i64,
}

/// Summary enriched with the derived accuracy percentage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    #[serde(flatten)]
    pub totals: ActivitySummary,
    /// `total_correct / total_questions * 100`, rounded to 2 decimals,
    /// 0 when no questions are recorded
    pub accuracy: f64,
}

/// The combined teacher-facing performance view for one student.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformance {
    pub summary: PerformanceSummary,
    pub heatmap: Vec<ActivityRecord>,
    pub monthly: Vec<MonthlyRollup>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body for `POST /activity/log-quiz`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogQuizRequest {
    /// Student identifier (required)
    pub user_id: Option<String>,
    /// Correct answers on this quiz (default 0)
    pub correct_answers: Option<i64>,
    /// Seconds spent, if the client measured them (default: quiz credit policy)
    pub practice_seconds: Option<i64>,
    /// Question count, credited per question when no duration is supplied
    pub questions: Option<i64>,
}

/// Body for `POST /activity/ai-reply`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiReplyRequest {
    /// Student identifier (required)
    pub user_id: Option<String>,
}

/// Body for `POST /activity/time`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogTimeRequest {
    /// Student identifier (required)
    pub user_id: Option<String>,
    /// Measured practice seconds (required)
    pub practice_seconds: Option<i64>,
}

/// Body for `POST /activity/log` (legacy bulk update).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogActivityRequest {
    /// Student identifier (required)
    pub user_id: Option<String>,
    /// Counter deltas; each defaults to 0 when absent
    #[serde(flatten)]
    pub delta: ActivityDelta,
}

/// Body for `POST /student/connect-teacher`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectTeacherRequest {
    /// Student identifier (required)
    pub student_id: Option<String>,
    /// Teacher identifier (required)
    pub teacher_id: Option<String>,
}

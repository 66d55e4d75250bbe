//! Database schema migration system.
//!
//! Migrations are versioned, sequential, and recorded in the
//! `schema_migrations` table. The base schema is created idempotently on
//! every open, so each migration is also written to be safe against
//! objects that already exist.

use crate::common::current_timestamp;
use rusqlite::{params, Connection, Result, Transaction};
use std::path::Path;

/// Migration trait for database schema changes
pub trait Migration {
    /// Unique version number (must be sequential)
    fn version(&self) -> u32;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Apply the migration (forward)
    fn up(&self, tx: &Transaction) -> Result<()>;

    /// Rollback the migration (backward)
    #[allow(dead_code)]
    fn down(&self, tx: &Transaction) -> Result<()>;
}

/// Migration runner for managing database migrations
pub struct MigrationRunner {
    conn: Connection,
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRunner {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // Enable WAL for concurrent access
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 10000)?;

        // Create migrations table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL,
                checksum TEXT NOT NULL,
                description TEXT,
                execution_time_ms INTEGER
            )",
            [],
        )?;

        Ok(Self {
            conn,
            migrations: Self::load_all_migrations(),
        })
    }

    /// Load all migration definitions
    fn load_all_migrations() -> Vec<Box<dyn Migration>> {
        vec![Box::new(InitialActivitySchema), Box::new(AddStudentLinks)]
    }

    /// Get current schema version
    pub fn current_version(&self) -> Result<u32> {
        let version: Option<u32> = self
            .conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(None);

        Ok(version.unwrap_or(0))
    }

    /// Run all pending migrations
    pub fn migrate(&mut self) -> Result<()> {
        let current = self.current_version()?;

        // Collect versions to run
        let versions_to_run: Vec<u32> = self
            .migrations
            .iter()
            .filter(|m| m.version() > current)
            .map(|m| m.version())
            .collect();

        for version in versions_to_run {
            let index = self
                .migrations
                .iter()
                .position(|m| m.version() == version)
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

            let start = std::time::Instant::now();
            let tx = self.conn.transaction()?;

            let migration = &self.migrations[index];
            migration.up(&tx)?;

            // Record migration
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at, checksum, description, execution_time_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    migration.version(),
                    current_timestamp(),
                    "", // Checksum placeholder
                    migration.description(),
                    start.elapsed().as_millis() as i64,
                ],
            )?;

            tx.commit()?;
        }

        Ok(())
    }
}

/// Migration 001: base activity ledger schema
pub struct InitialActivitySchema;

impl Migration for InitialActivitySchema {
    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &str {
        "Create daily_activity table and date index"
    }

    fn up(&self, tx: &Transaction) -> Result<()> {
        tx.execute(
            "CREATE TABLE IF NOT EXISTS daily_activity (
                user_id          TEXT NOT NULL,
                date             TEXT NOT NULL,
                ai_questions     INTEGER NOT NULL DEFAULT 0,
                quizzes_taken    INTEGER NOT NULL DEFAULT 0,
                correct_answers  INTEGER NOT NULL DEFAULT 0,
                practice_seconds INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, date)
            )",
            [],
        )?;
        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_daily_activity_date
             ON daily_activity(user_id, date DESC)",
            [],
        )?;
        Ok(())
    }

    fn down(&self, tx: &Transaction) -> Result<()> {
        tx.execute("DROP TABLE IF EXISTS daily_activity", [])?;
        Ok(())
    }
}

/// Migration 002: teacher-student links and meta table
pub struct AddStudentLinks;

impl Migration for AddStudentLinks {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &str {
        "Add student_links and meta tables"
    }

    fn up(&self, tx: &Transaction) -> Result<()> {
        tx.execute(
            "CREATE TABLE IF NOT EXISTS student_links (
                student_id        TEXT PRIMARY KEY,
                teacher_id        TEXT NOT NULL,
                status            TEXT NOT NULL DEFAULT 'active',
                first_activity_at TEXT NOT NULL,
                last_updated_at   TEXT NOT NULL
            )",
            [],
        )?;
        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_student_links_teacher
             ON student_links(teacher_id)",
            [],
        )?;
        tx.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('created_at', ?1)",
            params![current_timestamp()],
        )?;
        Ok(())
    }

    fn down(&self, tx: &Transaction) -> Result<()> {
        tx.execute("DROP TABLE IF EXISTS student_links", [])?;
        tx.execute("DROP TABLE IF EXISTS meta", [])?;
        Ok(())
    }
}

/// Run migrations against the database at `db_path` (best effort on startup).
pub fn run_migrations_on_db(db_path: &Path) -> Result<()> {
    let mut runner = MigrationRunner::new(db_path)?;
    runner.migrate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_migration_runner() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let mut runner = MigrationRunner::new(&db_path).unwrap();
        assert_eq!(runner.current_version().unwrap(), 0);

        runner.migrate().unwrap();
        // Two migrations: InitialActivitySchema (v1) and AddStudentLinks (v2)
        assert_eq!(runner.current_version().unwrap(), 2);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        run_migrations_on_db(&db_path).unwrap();
        run_migrations_on_db(&db_path).unwrap();

        let runner = MigrationRunner::new(&db_path).unwrap();
        assert_eq!(runner.current_version().unwrap(), 2);
    }

    #[test]
    fn test_migrated_schema_accepts_writes() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        run_migrations_on_db(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "INSERT INTO daily_activity (user_id, date, practice_seconds)
             VALUES ('u1', '2024-01-05', 30)",
            [],
        )
        .unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM daily_activity", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}

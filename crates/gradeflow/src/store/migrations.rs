//! Schema upgrades keyed on SQLite's `user_version`.
//!
//! Each step runs in its own transaction and bumps `user_version` on commit,
//! so an interrupted upgrade resumes at the first unapplied step.

use rusqlite::{Connection, TransactionBehavior};

use crate::error::PersistenceError;

/// Guard evaluated before a step's SQL runs.
enum Precondition {
    Always,
    /// Databases created by early builds may already carry the column.
    ColumnMissing {
        table: &'static str,
        column: &'static str,
    },
}

struct Step {
    name: &'static str,
    sql: &'static str,
    precondition: Precondition,
}

/// Applied in order; step `i` leaves the database at `user_version = i + 1`.
const STEPS: &[Step] = &[
    Step {
        name: "assignments",
        sql: include_str!("sql/001_create_assignments.sql"),
        precondition: Precondition::Always,
    },
    Step {
        name: "submissions",
        sql: include_str!("sql/002_create_submissions.sql"),
        precondition: Precondition::Always,
    },
    Step {
        name: "documents",
        sql: include_str!("sql/003_create_documents.sql"),
        precondition: Precondition::Always,
    },
    Step {
        name: "submissions.plagiarism_severity",
        sql: include_str!("sql/004_add_plagiarism_severity.sql"),
        precondition: Precondition::ColumnMissing {
            table: "submissions",
            column: "plagiarism_severity",
        },
    },
];

/// Schema version this build expects.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

pub fn current_version(conn: &Connection) -> Result<u32, PersistenceError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Brings the schema up to [`latest_version`].
pub fn run_all(conn: &mut Connection) -> Result<(), PersistenceError> {
    let from = current_version(conn)?;
    if from > latest_version() {
        return Err(PersistenceError::Migration {
            version: from,
            reason: format!(
                "database schema is newer than this build (expected at most {})",
                latest_version()
            ),
        });
    }

    for (index, step) in STEPS.iter().enumerate().skip(from as usize) {
        let version = index as u32 + 1;
        let fail = |e: rusqlite::Error| PersistenceError::Migration {
            version,
            reason: format!("{}: {}", step.name, e),
        };

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(fail)?;

        let apply = match step.precondition {
            Precondition::Always => true,
            Precondition::ColumnMissing { table, column } => !has_column(&tx, table, column)?,
        };
        if apply {
            log::info!("Applying schema v{} ({})", version, step.name);
            tx.execute_batch(step.sql).map_err(fail)?;
        } else {
            log::debug!("Schema v{} ({}) already present", version, step.name);
        }

        // PRAGMA does not take bound parameters.
        tx.execute_batch(&format!("PRAGMA user_version = {}", version))
            .map_err(fail)?;
        tx.commit().map_err(fail)?;
    }

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, PersistenceError> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")?;
    let count: i64 = stmt.query_row([table, column], |row| row.get(0))?;
    Ok(count > 0)
}

//! SQLite-backed submission and assignment stores.
//!
//! All access is serialized through a `Mutex<Connection>`; WAL mode keeps
//! status polling from other processes cheap.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{migrations, AssignmentStore, FieldUpdate, SubmissionStore};
use crate::error::PersistenceError;
use crate::model::{Assignment, ProcessingStatus, Severity, Submission, SubmissionText};
use crate::plagiarism::PlagiarismDetails;

/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const SUBMISSION_COLUMNS: &str = "id, assignment_id, student_id, ocr_text, correctness_score,
    correctness_label, final_score, plagiarism_result, plagiarism_details, plagiarism_severity,
    processing_status, processing_error, created_at, updated_at";

impl Database {
    /// Opens (or creates) the database at `path` and applies pending migrations.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&mut conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&Connection) -> Result<T, PersistenceError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        f(&conn)
    }

    pub fn insert_assignment(&self, assignment: &Assignment) -> Result<(), PersistenceError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO assignments (id, title, model_answer_text, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    assignment.id,
                    assignment.title,
                    assignment.model_answer_text,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Inserts a submission together with its uploaded document.
    pub fn insert_submission(
        &self,
        submission: &Submission,
        document: &[u8],
    ) -> Result<(), PersistenceError> {
        let details = encode_details(submission.plagiarism_details.as_ref())?;
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO submissions (id, assignment_id, student_id, ocr_text,
                 correctness_score, correctness_label, final_score, plagiarism_result,
                 plagiarism_details, plagiarism_severity, processing_status, processing_error,
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    submission.id,
                    submission.assignment_id,
                    submission.student_id,
                    submission.ocr_text,
                    submission.correctness_score,
                    submission.correctness_label.map(|l| l.as_str()),
                    submission.final_score,
                    submission.plagiarism_result.map(|v| v.as_str()),
                    details,
                    submission.processing_status.as_str(),
                    submission.processing_error,
                    submission.created_at,
                    submission.updated_at,
                ],
            )?;
            tx.execute(
                "INSERT INTO documents (submission_id, content, uploaded_at) VALUES (?1, ?2, ?3)",
                params![submission.id, document, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Replaces the uploaded document and puts the submission back to `Pending`.
    pub fn replace_document(&self, id: &str, document: &[u8]) -> Result<(), PersistenceError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO documents (submission_id, content, uploaded_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(submission_id) DO UPDATE SET content = excluded.content,
                 uploaded_at = excluded.uploaded_at",
                params![id, document, now],
            )?;
            tx.execute(
                "UPDATE submissions SET processing_status = ?2, processing_error = NULL,
                 plagiarism_details = NULL, updated_at = ?3 WHERE id = ?1",
                params![id, ProcessingStatus::Pending.as_str(), now],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Changes the grader's severity classification. The stored final score
    /// is stale until the submission is recomputed.
    pub fn set_severity(&self, id: &str, severity: Severity) -> Result<(), PersistenceError> {
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE submissions SET plagiarism_severity=?2, updated_at=?3 WHERE id=?1",
                params![id, severity.as_str(), chrono::Utc::now().to_rfc3339()],
            )?)
        })?;
        if updated == 0 {
            return Err(PersistenceError::Unavailable(format!(
                "submission '{}' does not exist",
                id
            )));
        }
        Ok(())
    }

    /// All submissions of an assignment, oldest first.
    pub fn list_submissions(&self, assignment_id: &str) -> Result<Vec<Submission>, PersistenceError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM submissions WHERE assignment_id = ?1 ORDER BY created_at, id",
                SUBMISSION_COLUMNS
            ))?;
            let rows = stmt.query_map(params![assignment_id], SubmissionRow::from_row)?;
            let mut submissions = Vec::new();
            for row in rows {
                submissions.push(row?.into_submission()?);
            }
            Ok(submissions)
        })
    }
}

fn encode_details(details: Option<&PlagiarismDetails>) -> Result<Option<String>, PersistenceError> {
    details
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| PersistenceError::CorruptValue {
            column: "plagiarism_details",
            reason: e.to_string(),
        })
}

/// A raw `submissions` row before enum and JSON columns are decoded.
struct SubmissionRow {
    id: String,
    assignment_id: String,
    student_id: String,
    ocr_text: Option<String>,
    correctness_score: Option<f64>,
    correctness_label: Option<String>,
    final_score: Option<f64>,
    plagiarism_result: Option<String>,
    plagiarism_details: Option<String>,
    plagiarism_severity: String,
    processing_status: String,
    processing_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SubmissionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            assignment_id: row.get("assignment_id")?,
            student_id: row.get("student_id")?,
            ocr_text: row.get("ocr_text")?,
            correctness_score: row.get("correctness_score")?,
            correctness_label: row.get("correctness_label")?,
            final_score: row.get("final_score")?,
            plagiarism_result: row.get("plagiarism_result")?,
            plagiarism_details: row.get("plagiarism_details")?,
            plagiarism_severity: row.get("plagiarism_severity")?,
            processing_status: row.get("processing_status")?,
            processing_error: row.get("processing_error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_submission(self) -> Result<Submission, PersistenceError> {
        let corrupt = |column: &'static str| move |reason: String| PersistenceError::CorruptValue {
            column,
            reason,
        };

        Ok(Submission {
            correctness_label: self
                .correctness_label
                .map(|s| s.parse())
                .transpose()
                .map_err(corrupt("correctness_label"))?,
            plagiarism_result: self
                .plagiarism_result
                .map(|s| s.parse())
                .transpose()
                .map_err(corrupt("plagiarism_result"))?,
            plagiarism_details: self
                .plagiarism_details
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(|e| corrupt("plagiarism_details")(e.to_string()))?,
            plagiarism_severity: self
                .plagiarism_severity
                .parse()
                .map_err(corrupt("plagiarism_severity"))?,
            processing_status: self
                .processing_status
                .parse()
                .map_err(corrupt("processing_status"))?,
            id: self.id,
            assignment_id: self.assignment_id,
            student_id: self.student_id,
            ocr_text: self.ocr_text,
            correctness_score: self.correctness_score,
            final_score: self.final_score,
            processing_error: self.processing_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl SubmissionStore for Database {
    fn get(&self, id: &str) -> Result<Option<Submission>, PersistenceError> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {} FROM submissions WHERE id = ?1", SUBMISSION_COLUMNS),
                    params![id],
                    SubmissionRow::from_row,
                )
                .optional()?)
        })?;
        row.map(SubmissionRow::into_submission).transpose()
    }

    fn load_document(&self, id: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT content FROM documents WHERE submission_id = ?1",
                    params![id],
                    |r| r.get(0),
                )
                .optional()?)
        })
    }

    fn save(&self, submission: &Submission) -> Result<(), PersistenceError> {
        let details = encode_details(submission.plagiarism_details.as_ref())?;
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE submissions SET ocr_text=?2, correctness_score=?3, correctness_label=?4,
                 final_score=?5, plagiarism_result=?6, plagiarism_details=?7,
                 processing_status=?8, processing_error=?9, updated_at=?10
                 WHERE id=?1",
                params![
                    submission.id,
                    submission.ocr_text,
                    submission.correctness_score,
                    submission.correctness_label.map(|l| l.as_str()),
                    submission.final_score,
                    submission.plagiarism_result.map(|v| v.as_str()),
                    details,
                    submission.processing_status.as_str(),
                    submission.processing_error,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?)
        })?;

        if updated == 0 {
            return Err(PersistenceError::Unavailable(format!(
                "submission '{}' does not exist",
                submission.id
            )));
        }
        Ok(())
    }

    fn set_field(&self, id: &str, update: FieldUpdate) -> Result<(), PersistenceError> {
        let now = chrono::Utc::now().to_rfc3339();
        let updated = self.with_conn(|conn| {
            let count = match &update {
                FieldUpdate::Status(status) => conn.execute(
                    "UPDATE submissions SET processing_status=?2, processing_error=NULL,
                     updated_at=?3 WHERE id=?1",
                    params![id, status.as_str(), now],
                )?,
                FieldUpdate::Failed(message) => conn.execute(
                    "UPDATE submissions SET processing_status=?2, processing_error=?3,
                     updated_at=?4 WHERE id=?1",
                    params![id, ProcessingStatus::Failed.as_str(), message, now],
                )?,
                FieldUpdate::PlagiarismResult(verdict) => conn.execute(
                    "UPDATE submissions SET plagiarism_result=?2, updated_at=?3 WHERE id=?1",
                    params![id, verdict.as_str(), now],
                )?,
                FieldUpdate::FinalScore(score) => conn.execute(
                    "UPDATE submissions SET final_score=?2, updated_at=?3 WHERE id=?1",
                    params![id, score, now],
                )?,
            };
            Ok(count)
        })?;

        if updated == 0 {
            return Err(PersistenceError::Unavailable(format!(
                "submission '{}' does not exist",
                id
            )));
        }
        Ok(())
    }

    fn cohort(
        &self,
        assignment_id: &str,
        exclude_id: &str,
    ) -> Result<Vec<SubmissionText>, PersistenceError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ocr_text FROM submissions
                 WHERE assignment_id = ?1 AND id != ?2
                 AND ocr_text IS NOT NULL AND TRIM(ocr_text) != ''
                 ORDER BY created_at, id",
            )?;
            let rows = stmt.query_map(params![assignment_id, exclude_id], |r| {
                Ok(SubmissionText {
                    id: r.get(0)?,
                    text: r.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

impl AssignmentStore for Database {
    fn get(&self, id: &str) -> Result<Option<Assignment>, PersistenceError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, title, model_answer_text FROM assignments WHERE id = ?1",
                    params![id],
                    |r| {
                        Ok(Assignment {
                            id: r.get(0)?,
                            title: r.get(1)?,
                            model_answer_text: r.get(2)?,
                        })
                    },
                )
                .optional()?)
        })
    }
}

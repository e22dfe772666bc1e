//! Persistent row types for the two task-store tables (`dim_books`,
//! `fct_chapter_tasks`) plus the transient value objects produced by the
//! parser before anything is written to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A book row in `dim_books`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Book {
    pub book_id: i64,
    pub title: String,
    pub author: Option<String>,
    pub total_chapters: i32,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a [`ChapterTask`].
///
/// Stored as the MySQL `ENUM('PENDING','PROCESSING','COMPLETED','FAILED')`
/// column; `sqlx` maps it through `String` at the query boundary (see
/// [`crate::db::TaskStore`]) because sqlx's MySQL driver does not decode
/// string enums without a derive that also needs `Type`/`Decode`/`Encode`
/// impls duplicating this match — spelling it out here keeps the mapping
/// obvious at the one place it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// The exact string stored in the `status` column.
    pub fn as_db_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "PROCESSING" => Ok(TaskStatus::Processing),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// A chapter-task row in `fct_chapter_tasks` — the queue element and the
/// unit of work. Business key is `(book_id, chapter_index)`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChapterTask {
    pub task_id: i64,
    pub book_id: i64,
    pub chapter_index: i32,
    pub chapter_title: String,
    pub content_text: String,
    pub status: String,
    pub priority: i16,
    pub retry_count: i32,
    pub next_retry_at: DateTime<Utc>,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub audio_url: Option<String>,
    pub audio_duration: Option<i32>,
    pub error_log: Option<String>,
}

impl ChapterTask {
    /// Parse the raw `status` column into a [`TaskStatus`].
    ///
    /// Panics on an unrecognized value: the column is constrained by a
    /// MySQL `ENUM`, so any other content indicates the schema and the
    /// application have drifted apart, which is a defect, not a runtime
    /// condition callers should handle.
    pub fn status(&self) -> TaskStatus {
        self.status
            .parse()
            .unwrap_or_else(|e| panic!("{e} (task_id={})", self.task_id))
    }
}

/// A single chapter extracted by the parser, 1-based and stable across a
/// single parse. Not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub index: usize,
    pub title: String,
    pub content: String,
}

/// Metadata plus ordered chapters produced by [`crate::parser::BookParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<Chapter>,
}

/// A half-open byte range inside the source text, with its derived
/// title. Used only during segmentation; `end` is filled in by
/// `finalize_sections` once every section's start is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub start: usize,
    pub end: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_str() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed: TaskStatus = status.as_db_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!("BOGUS".parse::<TaskStatus>().is_err());
    }
}

//! Relational task store: connection pool setup plus the row-level
//! locking queries shared by the importer, worker, and watchdog.
//!
//! Pool sizing mirrors the original SQLAlchemy engine
//! (`pool_size=10, max_overflow=20, pool_recycle=3600,
//! pool_pre_ping=True`): `max_connections` folds pool_size and overflow
//! into a single ceiling since `sqlx::Pool` has no separate overflow
//! concept, `max_lifetime` reproduces the recycle, and
//! `test_before_acquire` reproduces the pre-ping liveness check.
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::config::DatabaseConfig;
use crate::error::BookResult;
use crate::models::{Book, ChapterTask};

/// Handle to the MySQL-backed task store. Cheap to clone — it wraps a
/// pool internally.
#[derive(Clone)]
pub struct TaskStore {
    pool: MySqlPool,
}

impl TaskStore {
    /// Open a connection pool per `config` and verify connectivity.
    pub async fn connect(config: &DatabaseConfig) -> BookResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .max_lifetime(config.max_lifetime)
            .test_before_acquire(true)
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an already-open pool, used by tests that build their own
    /// pool against an ephemeral database.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Run pending migrations against the connected database.
    pub async fn migrate(&self) -> BookResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Insert a book keyed on its unique `title`, or update
    /// author/total_chapters if a book with that title already exists.
    /// Returns the `book_id` in either case.
    ///
    /// `book_id` is an autoincrement primary key, so a plain
    /// `ON DUPLICATE KEY UPDATE` can't report it back directly the way
    /// the original ORM's `result.lastrowid` (falling back to a SELECT
    /// by title) does. `LAST_INSERT_ID(book_id)` is the standard MySQL
    /// idiom for recovering the existing id through the same statement.
    pub async fn upsert_book(
        &self,
        title: &str,
        author: Option<&str>,
        total_chapters: i32,
    ) -> BookResult<i64> {
        sqlx::query(
            r#"
            INSERT INTO dim_books (title, author, total_chapters, created_at)
            VALUES (?, ?, ?, NOW(6))
            ON DUPLICATE KEY UPDATE
                book_id = LAST_INSERT_ID(book_id),
                author = VALUES(author),
                total_chapters = VALUES(total_chapters)
            "#,
        )
        .bind(title)
        .bind(author)
        .bind(total_chapters)
        .execute(&self.pool)
        .await?;

        let (book_id,): (i64,) = sqlx::query_as("SELECT LAST_INSERT_ID()")
            .fetch_one(&self.pool)
            .await?;
        Ok(book_id)
    }

    /// Insert one chapter task, or reset it back to a fresh `PENDING`
    /// state if the `(book_id, chapter_index)` pair already exists.
    ///
    /// The column list on the UPDATE branch is load-bearing: a re-import
    /// of an already-processed book must clear every field a prior run
    /// could have populated (lock, heartbeat, audio, error) so the task
    /// is picked up as if new, exactly as the original bulk upsert does.
    pub async fn upsert_chapter_task(
        &self,
        book_id: i64,
        chapter_index: i32,
        chapter_title: &str,
        content_text: &str,
        priority: i16,
    ) -> BookResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fct_chapter_tasks
                (book_id, chapter_index, chapter_title, content_text, status,
                 priority, retry_count, next_retry_at)
            VALUES (?, ?, ?, ?, 'PENDING', ?, 0, NOW(6))
            ON DUPLICATE KEY UPDATE
                chapter_title = VALUES(chapter_title),
                content_text = VALUES(content_text),
                status = 'PENDING',
                priority = LEAST(priority, VALUES(priority)),
                retry_count = 0,
                next_retry_at = NOW(6),
                locked_by = NULL,
                locked_at = NULL,
                last_heartbeat = NULL,
                audio_url = NULL,
                audio_duration = NULL,
                error_log = NULL
            "#,
        )
        .bind(book_id)
        .bind(chapter_index)
        .bind(chapter_title)
        .bind(content_text)
        .bind(priority)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomically lease the highest-priority, oldest-due pending task.
    ///
    /// `FOR UPDATE SKIP LOCKED` lets concurrent workers probe the same
    /// table without blocking on each other's candidate row; the
    /// caller's transaction commits (or rolls back) around the returned
    /// task, and that commit is what actually grants the lease.
    pub async fn fetch_one_pending(&self, worker_id: &str) -> BookResult<Option<ChapterTask>> {
        let mut tx = self.pool.begin().await?;
        let candidate: Option<ChapterTask> = sqlx::query_as(
            r#"
            SELECT * FROM fct_chapter_tasks
            WHERE status = 'PENDING' AND next_retry_at <= NOW(6)
            ORDER BY priority DESC, next_retry_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut task) = candidate else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE fct_chapter_tasks
            SET status = 'PROCESSING', locked_by = ?, locked_at = NOW(6), last_heartbeat = NOW(6)
            WHERE task_id = ?
            "#,
        )
        .bind(worker_id)
        .bind(task.task_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        task.status = "PROCESSING".to_string();
        task.locked_by = Some(worker_id.to_string());
        Ok(Some(task))
    }

    /// Refresh the heartbeat timestamp for a task this worker holds.
    ///
    /// Guarded on `locked_by = worker_id`: once the watchdog resurrects
    /// a task onto another worker, this worker's ticker must stop
    /// touching the row instead of clobbering the new owner's lease.
    pub async fn heartbeat(&self, task_id: i64, worker_id: &str) -> BookResult<()> {
        sqlx::query(
            "UPDATE fct_chapter_tasks SET last_heartbeat = NOW(6) WHERE task_id = ? AND locked_by = ?",
        )
        .bind(task_id)
        .bind(worker_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a task completed. Matches the original's `_mark_completed`,
    /// which updates by `task_id` alone with no `locked_by` guard — if
    /// the watchdog has already resurrected this task onto another
    /// worker, this still overwrites it with this worker's result
    /// (documented anomaly, see design notes on zombie completion).
    pub async fn mark_completed(
        &self,
        task_id: i64,
        audio_url: &str,
        audio_duration: i32,
    ) -> BookResult<()> {
        sqlx::query(
            r#"
            UPDATE fct_chapter_tasks
            SET status = 'COMPLETED', audio_url = ?, audio_duration = ?,
                last_heartbeat = NOW(6), locked_by = NULL, locked_at = NULL, error_log = NULL
            WHERE task_id = ?
            "#,
        )
        .bind(audio_url)
        .bind(audio_duration)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt: bump `retry_count`, and either mark the
    /// task `FAILED` once `retry_count` reaches `max_retries`, or send
    /// it back to `PENDING` with the next attempt scheduled `2^retries`
    /// minutes out (capped at 60).
    pub async fn handle_failure(
        &self,
        task_id: i64,
        retry_count: i32,
        max_retries: u32,
        error_message: &str,
    ) -> BookResult<()> {
        let retries = retry_count + 1;
        let truncated: String = error_message.chars().take(1000).collect();
        if retries as u32 >= max_retries {
            sqlx::query(
                r#"
                UPDATE fct_chapter_tasks
                SET status = 'FAILED', retry_count = ?, next_retry_at = NOW(6), error_log = ?,
                    locked_by = NULL, locked_at = NULL, last_heartbeat = NULL,
                    audio_url = NULL, audio_duration = NULL
                WHERE task_id = ?
                "#,
            )
            .bind(retries)
            .bind(&truncated)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
            return Ok(());
        }

        let backoff_minutes = 2u64.saturating_pow(retries.max(0) as u32).min(60);
        sqlx::query(
            r#"
            UPDATE fct_chapter_tasks
            SET status = 'PENDING', retry_count = ?, error_log = ?,
                next_retry_at = DATE_ADD(NOW(6), INTERVAL ? MINUTE),
                locked_by = NULL, locked_at = NULL, last_heartbeat = NULL,
                audio_url = NULL, audio_duration = NULL
            WHERE task_id = ?
            "#,
        )
        .bind(retries)
        .bind(&truncated)
        .bind(backoff_minutes as i64)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Find tasks stuck in `PROCESSING` whose heartbeat is missing or
    /// older than `threshold`, and reset them to `PENDING` so a worker
    /// can pick them back up. Returns the number of tasks reset.
    ///
    /// Mirrors `watchdog_service.py`'s `RESET_SQL`: the retry count is
    /// bumped (a watchdog reset counts as a failed attempt toward
    /// `max_retries`), `next_retry_at` is reset to now so the row is
    /// immediately eligible for leasing again, and `log_suffix` (an
    /// already-formatted `"\nReset by Watchdog at <ISO-8601>"` string)
    /// is appended to any existing `error_log` rather than overwriting
    /// it.
    ///
    /// The `last_heartbeat IS NULL` arm extends the original predicate:
    /// a crash between the lock UPDATE and the first heartbeat tick
    /// would otherwise orphan the row forever, since `locked_at` alone
    /// was never compared against the threshold upstream.
    pub async fn resurrect_stale(
        &self,
        threshold: DateTime<Utc>,
        log_suffix: &str,
    ) -> BookResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE fct_chapter_tasks
            SET status = 'PENDING',
                retry_count = retry_count + 1,
                locked_by = NULL, locked_at = NULL, last_heartbeat = NULL,
                next_retry_at = NOW(6),
                error_log = CONCAT(IFNULL(error_log, ''), ?)
            WHERE status = 'PROCESSING'
              AND (last_heartbeat IS NULL OR last_heartbeat < ?)
            "#,
        )
        .bind(log_suffix)
        .bind(threshold)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_book(&self, book_id: i64) -> BookResult<Option<Book>> {
        let book = sqlx::query_as("SELECT * FROM dim_books WHERE book_id = ?")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }
}

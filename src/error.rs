//! Error types for the book-to-audio pipeline.
//!
//! [`BookError`] covers every failure surface the three binaries
//! (`book-importer`, `book-worker`, `book-watchdog`) can hit: parsing a
//! source file, importing it into the task store, leasing a task,
//! synthesizing audio, and uploading the result. Worker-side variants are
//! never propagated out of the processing loop — they are converted into
//! task-state transitions (see [`crate::worker::processor`]) and only
//! surface here when something above that loop (config, pool setup) fails
//! outright.
use thiserror::Error;

/// All possible errors in the bookcast pipeline.
#[derive(Error, Debug)]
pub enum BookError {
    /// I/O failure reading a source file or the speaker reference audio.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing environment configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// No chapters could be derived from a source file by any segmentation
    /// strategy.
    #[error("no chapters detected in {path}")]
    Parse {
        /// Path of the file that failed to parse.
        path: String,
    },

    /// The task store rejected a book/chapter upsert.
    #[error("import failed for {path}: {message}")]
    Import {
        /// Path of the file being imported.
        path: String,
        /// Underlying failure description.
        message: String,
    },

    /// Lease acquisition against the task store failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// TTS synthesis, polling exhaustion, or a malformed response.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Blob store PUT failed.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Blob store pre-signed URL generation failed.
    #[error("presign failed: {0}")]
    Presign(String),

    /// A database operation failed outside the specific paths above
    /// (pool setup, migrations, watchdog sweep).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration failed during startup.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Catch-all wrapping any other failure.
    #[error("unexpected error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Specialized `Result` type for bookcast operations.
pub type BookResult<T> = Result<T, BookError>;

impl BookError {
    /// Build a [`BookError::Config`] with the given message.
    pub fn config<S: Into<String>>(message: S) -> Self {
        BookError::Config {
            message: message.into(),
        }
    }

    /// Build a [`BookError::Parse`] for the given source path.
    pub fn parse<S: Into<String>>(path: S) -> Self {
        BookError::Parse { path: path.into() }
    }

    /// Build a [`BookError::Import`] for the given source path and cause.
    pub fn import<S1: Into<String>, S2: Into<String>>(path: S1, message: S2) -> Self {
        BookError::Import {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Return the process exit code this error should produce.
    ///
    /// Mirrors the teacher's `SubXError::exit_code` convention: each
    /// category gets a stable, small, non-zero code so callers (and
    /// shell scripts wrapping the binaries) can distinguish failure
    /// classes without parsing stderr.
    pub fn exit_code(&self) -> i32 {
        match self {
            BookError::Io(_) => 1,
            BookError::Config { .. } => 2,
            BookError::Parse { .. } => 3,
            BookError::Import { .. } => 4,
            BookError::Fetch(_) => 5,
            BookError::Synthesis(_) => 6,
            BookError::Upload(_) | BookError::Presign(_) => 7,
            BookError::Database(_) => 8,
            BookError::Migration(_) => 8,
            BookError::Other(_) => 1,
        }
    }

    /// Render a message suitable for printing to stderr before exit.
    pub fn user_friendly_message(&self) -> String {
        match self {
            BookError::Config { message } => {
                format!(
                    "configuration error: {message}\nhint: check the environment variables documented in README.md"
                )
            }
            BookError::Database(err) => {
                format!(
                    "database error: {err}\nhint: verify DATABASE_URL and that migrations have been applied"
                )
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_round_trips() {
        let err = BookError::config("missing DATABASE_URL");
        assert!(matches!(err, BookError::Config { .. }));
        assert_eq!(err.to_string(), "configuration error: missing DATABASE_URL");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn parse_error_carries_path() {
        let err = BookError::parse("book.txt");
        assert_eq!(err.to_string(), "no chapters detected in book.txt");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn user_friendly_message_adds_hint_for_config() {
        let msg = BookError::config("bad value").user_friendly_message();
        assert!(msg.contains("configuration error:"));
        assert!(msg.contains("README.md"));
    }
}

//! bookcast library root.
//!
//! Converts long-form text books into per-chapter audio through a durable,
//! multi-worker relational-queue pipeline. See [`parser`] for the
//! text-to-chapters segmentation, [`importer`] for loading chapters into
//! the task store, [`worker`] for the fetch/synthesize/heartbeat loop, and
//! [`watchdog`] for stale-lease resurrection.

/// Package version, exposed for `--version` output and log lines.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod db;
pub mod error;
pub mod importer;
pub mod models;
pub mod parser;
pub mod storage;
pub mod tts;
pub mod watchdog;
pub mod worker;

/// Library-wide result alias.
pub type Result<T> = error::BookResult<T>;

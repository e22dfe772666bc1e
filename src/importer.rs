//! Loads a parsed book into the task store: one row in `dim_books`,
//! one row per chapter in `fct_chapter_tasks`.
use tracing::{debug, info};

use crate::db::TaskStore;
use crate::error::BookResult;
use crate::models::Chapter;
use crate::parser::BookParser;

/// Number of chapter rows upserted per batch. Keeps a single import
/// transaction-sized statement bounded regardless of book length —
/// mirrors the original ingester's `BATCH_SIZE`.
const BATCH_SIZE: usize = 200;

/// Fixed priority assigned to every freshly imported chapter task.
const DEFAULT_PRIORITY: i16 = 10;

pub struct Importer<'a> {
    store: &'a TaskStore,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a TaskStore) -> Self {
        Self { store }
    }

    /// Parse `path` and upsert its book + chapters into the task store.
    /// Returns the `book_id`.
    pub async fn import_file(&self, path: &std::path::Path) -> BookResult<i64> {
        info!(path = %path.display(), "parsing book file");
        let parser = BookParser::new(path)?;
        let metadata = parser.parse()?;
        info!(
            title = %metadata.title,
            chapters = metadata.chapters.len(),
            "parsed book"
        );

        let book_id = self
            .store
            .upsert_book(
                &metadata.title,
                metadata.author.as_deref(),
                metadata.chapters.len() as i32,
            )
            .await?;
        self.bulk_upsert_chapters(book_id, &metadata.chapters).await?;
        info!(title = %metadata.title, book_id, "import completed");
        Ok(book_id)
    }

    /// Upsert chapters in fixed-size batches. Each chapter is its own
    /// statement within the batch — `sqlx`'s query builder doesn't give
    /// us the multi-row `VALUES (...), (...), ...` single-statement
    /// upsert the original ORM call produces, so batching here groups
    /// chapters into one logging unit and one slice boundary rather
    /// than one SQL round trip; see DESIGN.md.
    async fn bulk_upsert_chapters(&self, book_id: i64, chapters: &[Chapter]) -> BookResult<()> {
        if chapters.is_empty() {
            return Ok(());
        }
        let mut total = 0usize;
        for batch in chapters.chunks(BATCH_SIZE) {
            for chapter in batch {
                self.store
                    .upsert_chapter_task(
                        book_id,
                        chapter.index as i32,
                        &chapter.title,
                        &chapter.content,
                        DEFAULT_PRIORITY,
                    )
                    .await?;
            }
            total += batch.len();
            debug!(book_id, batch = batch.len(), total, "upserted chapter batch");
        }
        info!(book_id, total, "completed chapter upsert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_matches_documented_constant() {
        assert_eq!(BATCH_SIZE, 200);
    }

    #[test]
    fn default_priority_is_ten() {
        assert_eq!(DEFAULT_PRIORITY, 10);
    }
}

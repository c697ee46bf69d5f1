//! SQLite-backed store: the concrete persistence layer behind the engine's
//! public operations. Threaded explicitly through the engine instead of
//! exposed as a global handle.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::{Config, ConfigKey};
use crate::error::{StoreError, StoreResult};
use crate::models::{Book, BookMeta, JaccardEdge, LibraryMetadata, Posting, SearchField, TermStats};

/// Owns the single process-wide SQLite connection: lifecycle is
/// init -> use -> close, and readers share it.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if necessary) the SQLite database at `path` and ensure
    /// the schema exists.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store, used by tests and by ephemeral CLI invocations.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                file_path TEXT NOT NULL,
                cover_image_path TEXT,
                word_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            );

            CREATE TABLE IF NOT EXISTS inverted_index (
                term TEXT NOT NULL,
                book_id INTEGER NOT NULL,
                term_frequency INTEGER NOT NULL,
                positions TEXT NOT NULL,
                PRIMARY KEY (term, book_id)
            );
            CREATE INDEX IF NOT EXISTS idx_inverted_index_book ON inverted_index(book_id);

            CREATE TABLE IF NOT EXISTS term_stats (
                term TEXT PRIMARY KEY,
                document_frequency INTEGER NOT NULL,
                total_frequency INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS jaccard_edges (
                book_id_1 INTEGER NOT NULL,
                book_id_2 INTEGER NOT NULL,
                similarity REAL NOT NULL,
                PRIMARY KEY (book_id_1, book_id_2)
            );
            CREATE INDEX IF NOT EXISTS idx_jaccard_b1 ON jaccard_edges(book_id_1);
            CREATE INDEX IF NOT EXISTS idx_jaccard_b2 ON jaccard_edges(book_id_2);

            CREATE TABLE IF NOT EXISTS pagerank (
                book_id INTEGER PRIMARY KEY,
                score REAL NOT NULL,
                last_updated TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            );

            CREATE TABLE IF NOT EXISTS book_clicks (
                book_id INTEGER PRIMARY KEY,
                click_count INTEGER NOT NULL DEFAULT 0,
                last_clicked TEXT
            );

            CREATE TABLE IF NOT EXISTS library_metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            );

            CREATE TABLE IF NOT EXISTS app_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                type TEXT NOT NULL,
                description TEXT
            );
            "#,
        )?;
        Ok(())
    }

    // -- books -----------------------------------------------------------

    /// Insert a new book row. The word count is filled in by the index
    /// builder once tokenization completes.
    pub fn insert_book(&self, meta: &BookMeta) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO books (title, author, file_path, cover_image_path, word_count)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![meta.title, meta.author, meta.file_path, meta.cover_image_path],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_book_word_count(&self, book_id: i64, word_count: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE books SET word_count = ?1 WHERE id = ?2",
            params![word_count, book_id],
        )?;
        Ok(())
    }

    pub fn get_book(&self, book_id: i64) -> StoreResult<Option<Book>> {
        self.conn
            .query_row(
                "SELECT b.id, b.title, b.author, b.file_path, b.cover_image_path,
                        b.word_count, b.created_at, COALESCE(c.click_count, 0)
                 FROM books b LEFT JOIN book_clicks c ON c.book_id = b.id
                 WHERE b.id = ?1",
                params![book_id],
                row_to_book,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn get_books(&self, book_ids: &[i64]) -> StoreResult<BTreeMap<i64, Book>> {
        let mut out = BTreeMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.title, b.author, b.file_path, b.cover_image_path,
                    b.word_count, b.created_at, COALESCE(c.click_count, 0)
             FROM books b LEFT JOIN book_clicks c ON c.book_id = b.id
             WHERE b.id = ?1",
        )?;
        for &id in book_ids {
            if let Some(book) = stmt.query_row(params![id], row_to_book).optional()? {
                out.insert(id, book);
            }
        }
        Ok(out)
    }

    pub fn all_book_ids(&self) -> StoreResult<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM books ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn books_matching_field_like(
        &self,
        field: SearchField,
        pattern: &str,
    ) -> StoreResult<Vec<i64>> {
        let sql = match field {
            SearchField::Title => "SELECT id FROM books WHERE title LIKE ?1",
            SearchField::Author => "SELECT id FROM books WHERE author LIKE ?1",
            SearchField::Content => unreachable!("content is matched via the inverted index"),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let like = format!("%{}%", pattern);
        let ids = stmt
            .query_map(params![like], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn record_click(&self, book_id: i64) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO book_clicks (book_id, click_count, last_clicked)
             VALUES (?1, 1, strftime('%Y-%m-%dT%H:%M:%fZ','now'))
             ON CONFLICT(book_id) DO UPDATE SET
                click_count = click_count + 1,
                last_clicked = strftime('%Y-%m-%dT%H:%M:%fZ','now')",
            params![book_id],
        )?;
        Ok(())
    }

    pub fn click_counts(&self) -> StoreResult<BTreeMap<i64, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT book_id, click_count FROM book_clicks")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().collect())
    }

    pub fn remove_book(&mut self, book_id: i64) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        // Restore term_stats for postings we are about to delete.
        {
            let mut stmt = tx.prepare(
                "SELECT term, term_frequency FROM inverted_index WHERE book_id = ?1",
            )?;
            let postings = stmt
                .query_map(params![book_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (term, tf) in postings {
                tx.execute(
                    "UPDATE term_stats
                     SET document_frequency = document_frequency - 1,
                         total_frequency = total_frequency - ?2
                     WHERE term = ?1",
                    params![term, tf],
                )?;
            }
            tx.execute(
                "DELETE FROM term_stats WHERE document_frequency <= 0",
                [],
            )?;
        }
        tx.execute("DELETE FROM inverted_index WHERE book_id = ?1", params![book_id])?;
        tx.execute(
            "DELETE FROM jaccard_edges WHERE book_id_1 = ?1 OR book_id_2 = ?1",
            params![book_id],
        )?;
        tx.execute("DELETE FROM pagerank WHERE book_id = ?1", params![book_id])?;
        tx.execute("DELETE FROM book_clicks WHERE book_id = ?1", params![book_id])?;
        tx.execute("DELETE FROM books WHERE id = ?1", params![book_id])?;
        tx.commit()?;
        Ok(())
    }

    // -- postings & term stats --------------------------------------------

    /// Write postings and upsert term statistics for one book atomically,
    /// in a single transaction. `batch_size` bounds the number of
    /// statements issued per inner chunk so the transaction stays bounded
    /// in size.
    pub fn write_postings(
        &mut self,
        book_id: i64,
        postings: &[Posting],
        batch_size: usize,
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM inverted_index WHERE book_id = ?1",
            params![book_id],
        )?;
        for chunk in postings.chunks(batch_size.max(1)) {
            for posting in chunk {
                let positions_json = serde_json::to_string(&posting.positions)?;
                tx.execute(
                    "INSERT OR REPLACE INTO inverted_index (term, book_id, term_frequency, positions)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![posting.term, book_id, posting.term_frequency, positions_json],
                )?;
                tx.execute(
                    "INSERT INTO term_stats (term, document_frequency, total_frequency)
                     VALUES (?1, 1, ?2)
                     ON CONFLICT(term) DO UPDATE SET
                        document_frequency = document_frequency + 1,
                        total_frequency = total_frequency + ?2",
                    params![posting.term, posting.term_frequency],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove postings and rebalance term stats for `book_id` prior to a
    /// reindex, without deleting the book row itself.
    pub fn clear_postings_for_reindex(&mut self, book_id: i64) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let mut stmt = tx.prepare(
            "SELECT term, term_frequency FROM inverted_index WHERE book_id = ?1",
        )?;
        let postings = stmt
            .query_map(params![book_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        for (term, tf) in postings {
            tx.execute(
                "UPDATE term_stats
                 SET document_frequency = document_frequency - 1,
                     total_frequency = total_frequency - ?2
                 WHERE term = ?1",
                params![term, tf],
            )?;
        }
        tx.execute("DELETE FROM term_stats WHERE document_frequency <= 0", [])?;
        tx.execute(
            "DELETE FROM inverted_index WHERE book_id = ?1",
            params![book_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn term_stats(&self, term: &str) -> StoreResult<Option<TermStats>> {
        self.conn
            .query_row(
                "SELECT document_frequency, total_frequency FROM term_stats WHERE term = ?1",
                params![term],
                |row| {
                    Ok(TermStats {
                        document_frequency: row.get::<_, i64>(0)? as u64,
                        total_frequency: row.get::<_, i64>(1)? as u64,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn all_term_document_frequencies(&self) -> StoreResult<BTreeMap<String, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT term, document_frequency FROM term_stats")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().collect())
    }

    /// Distinct terms in the vocabulary, used by the regex and fuzzy
    /// matchers.
    pub fn vocabulary(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT term FROM term_stats ORDER BY term")?;
        let terms = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(terms)
    }

    /// Book IDs whose inverted-index rows contain any of `terms`.
    pub fn book_ids_for_terms(&self, terms: &[String]) -> StoreResult<Vec<i64>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = terms.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT DISTINCT book_id FROM inverted_index WHERE term IN ({})",
            placeholders
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let params_dyn: Vec<&dyn rusqlite::ToSql> =
            terms.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
        let ids = stmt
            .query_map(params_dyn.as_slice(), |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// term -> (book_id -> term_frequency) restricted to `book_ids` and
    /// `terms`, fetched in one round-trip.
    pub fn term_frequencies(
        &self,
        book_ids: &[i64],
        terms: &[String],
    ) -> StoreResult<BTreeMap<String, BTreeMap<i64, u32>>> {
        let mut out: BTreeMap<String, BTreeMap<i64, u32>> = BTreeMap::new();
        if book_ids.is_empty() || terms.is_empty() {
            return Ok(out);
        }
        let term_placeholders = terms.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let book_placeholders = book_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT term, book_id, term_frequency FROM inverted_index
             WHERE term IN ({}) AND book_id IN ({})",
            term_placeholders, book_placeholders
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut bound: Vec<&dyn rusqlite::ToSql> =
            terms.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
        bound.extend(book_ids.iter().map(|b| b as &dyn rusqlite::ToSql));
        let rows = stmt
            .query_map(bound.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)? as u32,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (term, book_id, tf) in rows {
            out.entry(term).or_default().insert(book_id, tf);
        }
        Ok(out)
    }

    /// Positions for a single (term, book) posting, used by the highlighter.
    pub fn positions_for(&self, term: &str, book_id: i64) -> StoreResult<Option<Vec<u32>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT positions FROM inverted_index WHERE term = ?1 AND book_id = ?2",
                params![term, book_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All terms posted for a book, used by the graph builder and semantic
    /// similarity cache.
    pub fn terms_for_book(&self, book_id: i64) -> StoreResult<BTreeMap<String, u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT term, term_frequency FROM inverted_index WHERE book_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![book_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u32))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().collect())
    }

    // -- jaccard graph -----------------------------------------------------

    pub fn replace_jaccard_edges(&mut self, edges: &[JaccardEdge], batch_size: usize) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM jaccard_edges", [])?;
        for chunk in edges.chunks(batch_size.max(1)) {
            for edge in chunk {
                tx.execute(
                    "INSERT OR REPLACE INTO jaccard_edges (book_id_1, book_id_2, similarity)
                     VALUES (?1, ?2, ?3)",
                    params![edge.book_id_1, edge.book_id_2, edge.similarity],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn all_jaccard_edges(&self) -> StoreResult<Vec<JaccardEdge>> {
        let mut stmt = self
            .conn
            .prepare("SELECT book_id_1, book_id_2, similarity FROM jaccard_edges")?;
        let edges = stmt
            .query_map([], |row| {
                Ok(JaccardEdge {
                    book_id_1: row.get(0)?,
                    book_id_2: row.get(1)?,
                    similarity: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    pub fn neighbours_of(&self, book_id: i64) -> StoreResult<Vec<JaccardEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT book_id_1, book_id_2, similarity FROM jaccard_edges
             WHERE book_id_1 = ?1 OR book_id_2 = ?1",
        )?;
        let edges = stmt
            .query_map(params![book_id], |row| {
                Ok(JaccardEdge {
                    book_id_1: row.get(0)?,
                    book_id_2: row.get(1)?,
                    similarity: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    // -- pagerank ------------------------------------------------------------

    pub fn replace_pagerank(&mut self, scores: &BTreeMap<i64, f64>) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM pagerank", [])?;
        for (&book_id, &score) in scores {
            tx.execute(
                "INSERT OR REPLACE INTO pagerank (book_id, score, last_updated)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
                params![book_id, score],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn pagerank_scores(&self, book_ids: &[i64]) -> StoreResult<BTreeMap<i64, f64>> {
        let mut out = BTreeMap::new();
        if book_ids.is_empty() {
            return Ok(out);
        }
        let placeholders = book_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT book_id, score FROM pagerank WHERE book_id IN ({})",
            placeholders
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let bound: Vec<&dyn rusqlite::ToSql> =
            book_ids.iter().map(|b| b as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(bound.as_slice(), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        out.extend(rows);
        Ok(out)
    }

    pub fn pagerank_is_empty(&self) -> StoreResult<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pagerank", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    pub fn jaccard_edges_is_empty(&self) -> StoreResult<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jaccard_edges", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    pub fn book_count(&self) -> StoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count)
    }

    // -- library metadata ----------------------------------------------------

    pub fn update_library_metadata(&self, metadata: &LibraryMetadata) -> StoreResult<()> {
        let entries: [(&str, String); 7] = [
            ("totalBooks", metadata.total_books.to_string()),
            ("totalTerms", metadata.total_terms.to_string()),
            ("avgDocLength", metadata.avg_doc_length.to_string()),
            ("totalWords", metadata.total_words.to_string()),
            ("jaccardEdges", metadata.jaccard_edges.to_string()),
            ("pageRankCalculated", metadata.pagerank_calculated.to_string()),
            (
                "lastGutenbergID",
                metadata
                    .last_gutenberg_id
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ),
        ];
        for (key, value) in entries {
            self.conn.execute(
                "INSERT INTO library_metadata (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ','now'))
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')",
                params![key, value],
            )?;
        }
        Ok(())
    }

    pub fn load_library_metadata(&self) -> StoreResult<LibraryMetadata> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM library_metadata")?;
        let rows: BTreeMap<String, String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .collect();

        Ok(LibraryMetadata {
            total_books: rows.get("totalBooks").and_then(|v| v.parse().ok()).unwrap_or(0),
            total_terms: rows.get("totalTerms").and_then(|v| v.parse().ok()).unwrap_or(0),
            avg_doc_length: rows.get("avgDocLength").and_then(|v| v.parse().ok()).unwrap_or(0.0),
            total_words: rows.get("totalWords").and_then(|v| v.parse().ok()).unwrap_or(0),
            jaccard_edges: rows.get("jaccardEdges").and_then(|v| v.parse().ok()).unwrap_or(0),
            pagerank_calculated: rows
                .get("pageRankCalculated")
                .map(|v| v == "true")
                .unwrap_or(false),
            last_gutenberg_id: rows
                .get("lastGutenbergID")
                .and_then(|v| if v.is_empty() { None } else { v.parse().ok() }),
        })
    }

    // -- app config ----------------------------------------------------------

    pub fn set_config_value(&self, key: ConfigKey, value: &str, kind: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO app_config (key, value, type, description)
             VALUES (?1, ?2, ?3, NULL)
             ON CONFLICT(key) DO UPDATE SET value = ?2, type = ?3",
            params![key.as_str(), value, kind],
        )?;
        Ok(())
    }

    pub fn load_config_overrides(&self) -> StoreResult<BTreeMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM app_config")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().collect())
    }

    /// Apply persisted `app_config` overrides onto a freshly-defaulted
    /// `Config`, skipping anything unrecognized or default-only.
    pub fn load_config(&self) -> StoreResult<Config> {
        let mut config = Config::default();
        let overrides = self.load_config_overrides()?;
        apply_overrides(&mut config, &overrides);
        Ok(config)
    }
}

fn apply_overrides(config: &mut Config, overrides: &BTreeMap<String, String>) {
    macro_rules! apply {
        ($key:expr, $field:expr, $parse:ty) => {
            if let Some(v) = overrides.get($key) {
                if let Ok(parsed) = v.parse::<$parse>() {
                    $field = parsed;
                }
            }
        };
    }
    apply!("minWordLength", config.tokenizer.min_word_length, usize);
    apply!("removeStopWords", config.tokenizer.remove_stop_words, bool);
    apply!("caseSensitive", config.tokenizer.case_sensitive, bool);
    apply!("keepPositions", config.tokenizer.keep_positions, bool);
    apply!("maxTermFrequency", config.jaccard.max_term_frequency, f64);
    apply!("minSharedTerms", config.jaccard.min_shared_terms, usize);
    apply!("k1", config.bm25.k1, f64);
    apply!("b", config.bm25.b, f64);
    apply!("bm25Weight", config.bm25.bm25_weight, f64);
    apply!("pagerankWeight", config.bm25.pagerank_weight, f64);
    apply!(
        "enableProximityBonus",
        config.bm25.enable_proximity_bonus,
        bool
    );
    apply!("snippetCount", config.highlight.snippet_count, usize);
    apply!("snippetLength", config.highlight.snippet_length, usize);
    apply!("contextBefore", config.highlight.context_before, usize);
    apply!("contextAfter", config.highlight.context_after, usize);
    apply!("maxDistance", config.fuzzy.max_distance, usize);
}

fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        file_path: row.get(3)?,
        cover_image_path: row.get(4)?,
        word_count: row.get(5)?,
        created_at: row.get(6)?,
        click_count: row.get(7)?,
    })
}

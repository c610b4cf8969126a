//! Relational persistence for pages, link edges, keyword indices and ranks.
//!
//! All statements are parameterized. The only text spliced into SQL is a
//! table name picked from [`Field`], never page or keyword content.

use crate::identity::{KeywordId, PageId};
use crate::index::{Field, FieldIndex, IndexBatch, InvertedRow, Page};
use crate::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pages (
    page_id INTEGER PRIMARY KEY,
    size INTEGER NOT NULL,
    last_modification_date INTEGER NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    clean_body TEXT NOT NULL,
    clean_title TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS keywords (
    keyword_id INTEGER PRIMARY KEY,
    keyword TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS inverted_index (
    page_id INTEGER NOT NULL REFERENCES pages (page_id) ON DELETE CASCADE,
    keyword_id INTEGER NOT NULL REFERENCES keywords (keyword_id) ON DELETE CASCADE,
    keyword_count INTEGER NOT NULL,
    UNIQUE (page_id, keyword_id)
);
CREATE TABLE IF NOT EXISTS title_inverted_index (
    page_id INTEGER NOT NULL REFERENCES pages (page_id) ON DELETE CASCADE,
    keyword_id INTEGER NOT NULL REFERENCES keywords (keyword_id) ON DELETE CASCADE,
    keyword_count INTEGER NOT NULL,
    UNIQUE (page_id, keyword_id)
);
CREATE TABLE IF NOT EXISTS forward_index (
    keyword_id INTEGER PRIMARY KEY REFERENCES keywords (keyword_id) ON DELETE CASCADE,
    keyword_count INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS title_forward_index (
    keyword_id INTEGER PRIMARY KEY REFERENCES keywords (keyword_id) ON DELETE CASCADE,
    keyword_count INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS parent_child (
    parent_id INTEGER NOT NULL REFERENCES pages (page_id) ON DELETE CASCADE,
    child_id INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS parent_child_parent ON parent_child (parent_id);
CREATE INDEX IF NOT EXISTS parent_child_child ON parent_child (child_id);
CREATE TABLE IF NOT EXISTS page_ranks (
    page_id INTEGER PRIMARY KEY REFERENCES pages (page_id) ON DELETE CASCADE,
    score REAL NOT NULL
);
";

/// How index inserts treat a row whose key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Fail the whole batch.
    Abort,
    /// Keep the existing row.
    Ignore,
}

impl OnConflict {
    fn verb(self) -> &'static str {
        match self {
            OnConflict::Abort => "INSERT",
            OnConflict::Ignore => "INSERT OR IGNORE",
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- pages ---

    /// Stored modification timestamp of a page, if the page exists.
    pub fn modified_at(&self, page_id: PageId) -> Result<Option<i64>> {
        let ts = self
            .conn
            .query_row(
                "SELECT last_modification_date FROM pages WHERE page_id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }

    pub fn insert_page(&self, page: &Page) -> Result<()> {
        self.conn.execute(
            "INSERT INTO pages (page_id, size, last_modification_date, title, url, clean_body, clean_title)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                page.page_id,
                page.size,
                page.last_modified,
                page.title,
                page.url,
                page.clean_body,
                page.clean_title
            ],
        )?;
        Ok(())
    }

    /// Deletes a page; its index rows, outbound edges and rank cascade with it.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM pages WHERE page_id = ?1", params![page_id])?;
        Ok(n > 0)
    }

    pub fn page(&self, page_id: PageId) -> Result<Option<Page>> {
        let page = self
            .conn
            .query_row(
                "SELECT page_id, url, title, clean_title, clean_body, size, last_modification_date
                 FROM pages WHERE page_id = ?1",
                params![page_id],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    /// All pages ordered by identity.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, url, title, clean_title, clean_body, size, last_modification_date
             FROM pages ORDER BY page_id",
        )?;
        let pages = stmt.query_map([], page_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    pub fn page_ids(&self) -> Result<Vec<PageId>> {
        let mut stmt = self.conn.prepare("SELECT page_id FROM pages ORDER BY page_id")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    pub fn page_count(&self) -> Result<usize> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // --- link graph ---

    pub fn insert_edges(&mut self, edges: &[(PageId, PageId)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO parent_child (parent_id, child_id) VALUES (?1, ?2)")?;
            for (parent, child) in edges {
                stmt.execute(params![parent, child])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn edges(&self) -> Result<Vec<(PageId, PageId)>> {
        let mut stmt = self.conn.prepare("SELECT parent_id, child_id FROM parent_child ORDER BY rowid")?;
        let edges = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// URLs of stored pages linking to `page_id`.
    pub fn parent_urls(&self, page_id: PageId) -> Result<Vec<String>> {
        self.linked_urls(
            "SELECT DISTINCT p.url FROM parent_child e JOIN pages p ON p.page_id = e.parent_id
             WHERE e.child_id = ?1 ORDER BY p.url",
            page_id,
        )
    }

    /// URLs of stored pages `page_id` links to.
    pub fn child_urls(&self, page_id: PageId) -> Result<Vec<String>> {
        self.linked_urls(
            "SELECT DISTINCT p.url FROM parent_child e JOIN pages p ON p.page_id = e.child_id
             WHERE e.parent_id = ?1 ORDER BY p.url",
            page_id,
        )
    }

    fn linked_urls(&self, sql: &str, page_id: PageId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let urls = stmt
            .query_map(params![page_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(urls)
    }

    // --- keyword indices ---

    /// Empties every derived table so the next batch starts from nothing.
    pub fn clear_index(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM inverted_index;
             DELETE FROM title_inverted_index;
             DELETE FROM forward_index;
             DELETE FROM title_forward_index;
             DELETE FROM keywords;
             DELETE FROM page_ranks;",
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Writes keywords, inverted rows and forward counts of both fields in one transaction.
    /// Keywords are always insert-or-ignore; `conflict` governs the index rows.
    pub fn write_index_batch(&mut self, batch: &IndexBatch, conflict: OnConflict) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO keywords (keyword_id, keyword) VALUES (?1, ?2)")?;
            for (keyword_id, keyword) in &batch.keywords {
                stmt.execute(params![keyword_id, keyword])?;
            }
        }
        for field in Field::ALL {
            write_field(&tx, field, batch.field(field), conflict)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn keywords(&self) -> Result<Vec<(KeywordId, String)>> {
        let mut stmt = self.conn.prepare("SELECT keyword_id, keyword FROM keywords ORDER BY keyword_id")?;
        let keywords = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keywords)
    }

    /// The keyword vocabulary as plain strings, alphabetically.
    pub fn keyword_texts(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT keyword FROM keywords ORDER BY keyword")?;
        let words = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }

    pub fn inverted_rows(&self, field: Field) -> Result<Vec<InvertedRow>> {
        let sql = format!(
            "SELECT page_id, keyword_id, keyword_count FROM {} ORDER BY page_id, keyword_id",
            field.inverted_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(InvertedRow { page_id: row.get(0)?, keyword_id: row.get(1)?, count: row.get(2)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn inverted_rows_for_page(&self, field: Field, page_id: PageId) -> Result<Vec<InvertedRow>> {
        let sql = format!(
            "SELECT page_id, keyword_id, keyword_count FROM {} WHERE page_id = ?1 ORDER BY keyword_id",
            field.inverted_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![page_id], |row| {
                Ok(InvertedRow { page_id: row.get(0)?, keyword_id: row.get(1)?, count: row.get(2)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn forward_counts(&self, field: Field) -> Result<HashMap<KeywordId, u32>> {
        let sql = format!("SELECT keyword_id, keyword_count FROM {}", field.forward_table());
        let mut stmt = self.conn.prepare(&sql)?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(counts)
    }

    /// The `limit` most frequent keywords of a page, body and title counts summed per keyword text.
    pub fn top_keywords(&self, page_id: PageId, limit: u32) -> Result<Vec<(String, u32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT k.keyword, SUM(i.keyword_count) AS total
             FROM (
                 SELECT keyword_id, keyword_count FROM inverted_index WHERE page_id = ?1
                 UNION ALL
                 SELECT keyword_id, keyword_count FROM title_inverted_index WHERE page_id = ?1
             ) i
             JOIN keywords k ON k.keyword_id = i.keyword_id
             GROUP BY k.keyword
             ORDER BY total DESC, k.keyword
             LIMIT ?2",
        )?;
        let top = stmt
            .query_map(params![page_id, limit], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(top)
    }

    // --- ranks ---

    /// Replaces every stored rank with `ranks`.
    pub fn replace_page_ranks(&mut self, ranks: &HashMap<PageId, f64>) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM page_ranks", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO page_ranks (page_id, score) VALUES (?1, ?2)")?;
            for (page_id, score) in ranks {
                stmt.execute(params![page_id, score])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn page_ranks(&self) -> Result<HashMap<PageId, f64>> {
        let mut stmt = self.conn.prepare("SELECT page_id, score FROM page_ranks")?;
        let ranks = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(ranks)
    }
}

fn write_field(conn: &Connection, field: Field, index: &FieldIndex, conflict: OnConflict) -> Result<()> {
    let sql = format!(
        "{} INTO {} (page_id, keyword_id, keyword_count) VALUES (?1, ?2, ?3)",
        conflict.verb(),
        field.inverted_table()
    );
    let mut stmt = conn.prepare(&sql)?;
    for row in &index.inverted {
        stmt.execute(params![row.page_id, row.keyword_id, row.count])?;
    }

    let sql = format!(
        "{} INTO {} (keyword_id, keyword_count) VALUES (?1, ?2)",
        conflict.verb(),
        field.forward_table()
    );
    let mut stmt = conn.prepare(&sql)?;
    for (keyword_id, count) in &index.forward {
        stmt.execute(params![keyword_id, count])?;
    }
    Ok(())
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        page_id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        clean_title: row.get(3)?,
        clean_body: row.get(4)?,
        size: row.get(5)?,
        last_modified: row.get(6)?,
    })
}

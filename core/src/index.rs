use crate::identity::{self, KeywordId, PageId};
use crate::tokenizer::clean_text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A crawled page as persisted in the `pages` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_id: PageId,
    /// Normalized URL; `page_id` is derived from it.
    pub url: String,
    pub title: String,
    pub clean_title: String,
    pub clean_body: String,
    /// Size in bytes as reported by the server.
    pub size: i64,
    /// Unix seconds.
    pub last_modified: i64,
}

impl Page {
    /// Builds a page from extracted text. `url` must already be normalized.
    pub fn new(url: impl Into<String>, title: impl Into<String>, text: &str, size: i64, last_modified: i64) -> Self {
        let url = url.into();
        let title = title.into();
        Self {
            page_id: identity::page_id(&url),
            clean_title: clean_text(&title),
            clean_body: clean_text(text),
            url,
            title,
            size,
            last_modified,
        }
    }
}

/// The two indexed text fields of a page. Each has its own inverted and forward table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Body,
    Title,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Body, Field::Title];

    pub(crate) fn inverted_table(self) -> &'static str {
        match self {
            Field::Body => "inverted_index",
            Field::Title => "title_inverted_index",
        }
    }

    pub(crate) fn forward_table(self) -> &'static str {
        match self {
            Field::Body => "forward_index",
            Field::Title => "title_forward_index",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Body => f.write_str("body"),
            Field::Title => f.write_str("title"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedRow {
    pub page_id: PageId,
    pub keyword_id: KeywordId,
    pub count: u32,
}

/// Inverted rows plus corpus-wide counts for one field.
#[derive(Debug, Default, Clone)]
pub struct FieldIndex {
    pub inverted: Vec<InvertedRow>,
    pub forward: BTreeMap<KeywordId, u32>,
}

impl FieldIndex {
    fn field_rows(&self) -> usize {
        self.inverted.len() + self.forward.len()
    }
}

/// Everything one indexing pass produces, ready to be written in a single transaction.
#[derive(Debug, Default, Clone)]
pub struct IndexBatch {
    pub keywords: BTreeMap<KeywordId, String>,
    pub body: FieldIndex,
    pub title: FieldIndex,
}

impl IndexBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&self, field: Field) -> &FieldIndex {
        match field {
            Field::Body => &self.body,
            Field::Title => &self.title,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut FieldIndex {
        match field {
            Field::Body => &mut self.body,
            Field::Title => &mut self.title,
        }
    }

    /// Counts `keywords` for one page and field: registers each distinct
    /// keyword, emits one inverted row per keyword and adds to the corpus totals.
    ///
    /// Counts are keyed by identity, so strings colliding on the same
    /// identity share one row and the first text registered wins.
    pub fn add_page<I>(&mut self, page_id: PageId, field: Field, keywords: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut local: BTreeMap<KeywordId, u32> = BTreeMap::new();
        for keyword in keywords {
            let keyword_id = identity::keyword_id(&keyword);
            self.keywords.entry(keyword_id).or_insert(keyword);
            *local.entry(keyword_id).or_insert(0) += 1;
        }
        let index = self.field_mut(field);
        for (keyword_id, count) in local {
            index.inverted.push(InvertedRow { page_id, keyword_id, count });
            *index.forward.entry(keyword_id).or_insert(0) += count;
        }
    }

    pub fn row_count(&self) -> usize {
        self.keywords.len() + self.body.field_rows() + self.title.field_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_identity_follows_url() {
        let page = Page::new("https://example.com/a", "Hello, World!", "Some <b>text</b>", 10, 1);
        assert_eq!(page.page_id, identity::page_id("https://example.com/a"));
        assert_eq!(page.clean_title, "hello world");
        assert_eq!(page.clean_body, "some b text b");
    }

    #[test]
    fn add_page_accumulates_local_and_corpus_counts() {
        let mut batch = IndexBatch::new();
        let words = |s: &str| s.split(' ').map(str::to_string).collect::<Vec<_>>();
        batch.add_page(1, Field::Body, words("rust rust crab"));
        batch.add_page(2, Field::Body, words("rust"));

        let rust = identity::keyword_id("rust");
        let crab = identity::keyword_id("crab");
        assert_eq!(batch.keywords.len(), 2);
        assert!(batch.body.inverted.contains(&InvertedRow { page_id: 1, keyword_id: rust, count: 2 }));
        assert!(batch.body.inverted.contains(&InvertedRow { page_id: 2, keyword_id: rust, count: 1 }));
        assert_eq!(batch.body.forward[&rust], 3);
        assert_eq!(batch.body.forward[&crab], 1);
        assert!(batch.title.inverted.is_empty());
    }
}

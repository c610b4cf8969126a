//! Turns stored pages into keyword, inverted and forward index rows.

use crate::index::{Field, IndexBatch, Page};
use crate::persist::{OnConflict, Store};
use crate::phrase::PhraseExtractor;
use crate::tokenizer::{analyze, canonical_phrase};
use crate::Result;
use serde::Serialize;

/// Phrase spans outside this word range are discarded.
const PHRASE_WORDS: std::ops::RangeInclusive<usize> = 2..=3;

#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexStats {
    pub pages: usize,
    pub single_keywords: usize,
    pub phrase_keywords: usize,
    pub rows_written: usize,
}

/// Single-term pass: stopword-filtered, stemmed body and title tokens.
pub fn index_single_terms(pages: &[Page]) -> IndexBatch {
    let mut batch = IndexBatch::new();
    for page in pages {
        batch.add_page(page.page_id, Field::Body, analyze(&page.clean_body));
        batch.add_page(page.page_id, Field::Title, analyze(&page.clean_title));
    }
    batch
}

/// Phrase pass: 2-3 word spans, each word stemmed, joined by single spaces.
/// Surface variants stemming to the same sequence share one keyword.
pub fn index_phrases(pages: &[Page], extractor: &dyn PhraseExtractor) -> IndexBatch {
    let mut batch = IndexBatch::new();
    for page in pages {
        batch.add_page(page.page_id, Field::Body, phrases_of(extractor, &page.clean_body));
        batch.add_page(page.page_id, Field::Title, phrases_of(extractor, &page.clean_title));
    }
    batch
}

fn phrases_of(extractor: &dyn PhraseExtractor, text: &str) -> Vec<String> {
    extractor
        .extract(text)
        .into_iter()
        .filter(|span| PHRASE_WORDS.contains(&span.len()))
        .map(|span| canonical_phrase(&span))
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

/// Full rebuild: clears every derived table, then writes the single-term
/// batch followed by the phrase batch. Phrase rows never displace a
/// single-term row that shares their identity.
pub fn rebuild_index(store: &mut Store, extractor: &dyn PhraseExtractor) -> Result<IndexStats> {
    let pages = store.pages()?;
    store.clear_index()?;

    let single = index_single_terms(&pages);
    store.write_index_batch(&single, OnConflict::Abort)?;
    tracing::debug!(keywords = single.keywords.len(), "wrote single-term index");

    let phrases = index_phrases(&pages, extractor);
    store.write_index_batch(&phrases, OnConflict::Ignore)?;
    tracing::debug!(keywords = phrases.keywords.len(), "wrote phrase index");

    let stats = IndexStats {
        pages: pages.len(),
        single_keywords: single.keywords.len(),
        phrase_keywords: phrases.keywords.len(),
        rows_written: single.row_count() + phrases.row_count(),
    };
    tracing::info!(
        pages = stats.pages,
        single_keywords = stats.single_keywords,
        phrase_keywords = stats.phrase_keywords,
        "index rebuilt"
    );
    Ok(stats)
}

//! Multi-word span detection behind a swappable interface.

use crate::tokenizer::is_stopword;

/// Finds candidate multi-word spans in cleaned text.
///
/// Implementations return spans as word sequences in text order; the indexer
/// decides which lengths it keeps and how they are canonicalized.
pub trait PhraseExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<Vec<String>>;
}

/// Treats stopwords and one-letter words as phrase boundaries and cuts every
/// remaining run of content words into consecutive chunks of `max_words`.
#[derive(Debug, Clone)]
pub struct StopwordChunker {
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for StopwordChunker {
    fn default() -> Self {
        Self { min_words: 2, max_words: 3 }
    }
}

impl StopwordChunker {
    fn flush(&self, run: &mut Vec<String>, spans: &mut Vec<Vec<String>>) {
        for chunk in run.chunks(self.max_words.max(1)) {
            if chunk.len() >= self.min_words {
                spans.push(chunk.to_vec());
            }
        }
        run.clear();
    }
}

impl PhraseExtractor for StopwordChunker {
    fn extract(&self, text: &str) -> Vec<Vec<String>> {
        let mut spans = Vec::new();
        let mut run: Vec<String> = Vec::new();
        for word in text.split_whitespace() {
            let lower = word.to_lowercase();
            if lower.chars().count() < 2 || is_stopword(&lower) {
                self.flush(&mut run, &mut spans);
            } else {
                run.push(word.to_string());
            }
        }
        self.flush(&mut run, &mut spans);
        spans
    }
}

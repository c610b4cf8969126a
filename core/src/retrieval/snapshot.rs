use crate::identity::{KeywordId, PageId};
use crate::index::{Field, InvertedRow};
use crate::persist::Store;
use crate::tokenizer::analyze;
use crate::{Error, Result};
use std::collections::HashMap;

/// Sparse keyword weights of one page field or one query.
pub type TermVector = HashMap<KeywordId, f64>;

/// Per-page projections used at query time.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub body: TermVector,
    pub title: TermVector,
    /// Stopword-free stemmed text, space separated, for phrase matching.
    pub stemmed_body: String,
    pub stemmed_title: String,
}

/// Immutable, process-lifetime view of the persisted index.
///
/// Loaded once; picking up a rebuilt index means loading a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    page_ids: Vec<PageId>,
    documents: HashMap<PageId, Document>,
    keyword_ids: HashMap<String, KeywordId>,
    ranks: HashMap<PageId, f64>,
}

impl Snapshot {
    pub fn load(store: &Store) -> Result<Self> {
        let pages = store.pages()?;
        let page_count = pages.len();
        let mut body = tfidf_vectors(store.inverted_rows(Field::Body)?, &store.forward_counts(Field::Body)?, page_count, Field::Body)?;
        let mut title =
            tfidf_vectors(store.inverted_rows(Field::Title)?, &store.forward_counts(Field::Title)?, page_count, Field::Title)?;

        let mut page_ids = Vec::with_capacity(page_count);
        let mut documents = HashMap::with_capacity(page_count);
        for page in pages {
            let document = Document {
                body: body.remove(&page.page_id).unwrap_or_default(),
                title: title.remove(&page.page_id).unwrap_or_default(),
                stemmed_body: analyze(&page.clean_body).join(" "),
                stemmed_title: analyze(&page.clean_title).join(" "),
            };
            page_ids.push(page.page_id);
            documents.insert(page.page_id, document);
        }

        let keyword_ids = store.keywords()?.into_iter().map(|(id, keyword)| (keyword, id)).collect::<HashMap<_, _>>();
        let ranks = store.page_ranks()?;
        tracing::info!(pages = page_ids.len(), keywords = keyword_ids.len(), "retrieval snapshot loaded");
        Ok(Self { page_ids, documents, keyword_ids, ranks })
    }

    /// Page identities in a stable order.
    pub fn page_ids(&self) -> &[PageId] {
        &self.page_ids
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn document(&self, page_id: PageId) -> Option<&Document> {
        self.documents.get(&page_id)
    }

    pub fn keyword_id(&self, keyword: &str) -> Option<KeywordId> {
        self.keyword_ids.get(keyword).copied()
    }

    pub fn rank(&self, page_id: PageId) -> Option<f64> {
        self.ranks.get(&page_id).copied()
    }
}

/// `weight = tf * log2(N / corpus_count) / max_tf` for every inverted row.
fn tfidf_vectors(
    rows: Vec<InvertedRow>,
    forward: &HashMap<KeywordId, u32>,
    page_count: usize,
    field: Field,
) -> Result<HashMap<PageId, TermVector>> {
    let mut per_page: HashMap<PageId, Vec<InvertedRow>> = HashMap::new();
    for row in rows {
        per_page.entry(row.page_id).or_default().push(row);
    }

    let n = page_count as f64;
    let mut vectors = HashMap::with_capacity(per_page.len());
    for (page_id, rows) in per_page {
        let max_tf = rows.iter().map(|r| r.count).max().unwrap_or(0);
        if max_tf == 0 {
            vectors.insert(page_id, TermVector::new());
            continue;
        }
        let mut vector = TermVector::with_capacity(rows.len());
        for row in rows {
            let corpus_count = forward
                .get(&row.keyword_id)
                .copied()
                .filter(|&c| c > 0)
                .ok_or(Error::MissingForwardEntry { keyword_id: row.keyword_id, field })?;
            let idf = (n / corpus_count as f64).log2();
            vector.insert(row.keyword_id, row.count as f64 * idf / max_tf as f64);
        }
        vectors.insert(page_id, vector);
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_follow_max_tf_normalized_tfidf() {
        let rows = vec![
            InvertedRow { page_id: 1, keyword_id: 10, count: 2 },
            InvertedRow { page_id: 1, keyword_id: 11, count: 1 },
        ];
        let forward = HashMap::from([(10, 2), (11, 1)]);
        let vectors = tfidf_vectors(rows, &forward, 4, Field::Body).unwrap();
        let v = &vectors[&1];
        assert!((v[&10] - 1.0).abs() < 1e-12); // 2 * log2(4/2) / 2
        assert!((v[&11] - 1.0).abs() < 1e-12); // 1 * log2(4/1) / 2
    }

    #[test]
    fn missing_forward_row_is_an_error() {
        let rows = vec![InvertedRow { page_id: 1, keyword_id: 10, count: 1 }];
        let err = tfidf_vectors(rows, &HashMap::new(), 1, Field::Title).unwrap_err();
        assert!(matches!(err, Error::MissingForwardEntry { keyword_id: 10, field: Field::Title }));
    }
}

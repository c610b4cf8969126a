use super::snapshot::{Snapshot, TermVector};
use crate::identity::{self, KeywordId};
use crate::tokenizer::{canonical_phrase, is_stopword, stem, strip_token};
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref QUOTED: Regex = Regex::new(r#""([^"]*)""#).expect("valid regex");
}

#[derive(Debug, Clone, Default)]
pub struct ParsedQuery {
    /// Resolved single-term identities followed by the identity of every quoted phrase.
    pub terms: Vec<KeywordId>,
    /// Whole-token patterns matched against cached stemmed text.
    pub phrases: Vec<Regex>,
}

/// Splits a query into keyword identities and phrase patterns.
///
/// Free tokens that strip to nothing, are stopwords, or are unknown to the
/// snapshot are dropped. Quoted phrases yield both a pattern and a phrase
/// keyword identity.
pub fn parse_query(snapshot: &Snapshot, query: &str, max_tokens: usize) -> Result<ParsedQuery> {
    let mut parsed = ParsedQuery::default();

    for token in query.split_whitespace().take(max_tokens) {
        let stripped = strip_token(token);
        if stripped.is_empty() || is_stopword(&stripped) {
            continue;
        }
        if let Some(id) = snapshot.keyword_id(&stem(&stripped)) {
            parsed.terms.push(id);
        }
    }

    for captures in QUOTED.captures_iter(query) {
        let words: Vec<&str> = captures[1].split_whitespace().collect();
        let phrase = canonical_phrase(&words);
        if phrase.is_empty() {
            continue;
        }
        parsed.phrases.push(whole_token_pattern(&phrase)?);
        parsed.terms.push(identity::keyword_id(&phrase));
    }

    Ok(parsed)
}

/// Matches `phrase` only where it is bounded by whitespace or the text edges.
pub fn whole_token_pattern(phrase: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(r"(?:^|\s){}(?:\s|$)", regex::escape(phrase)))?)
}

/// Raw term frequencies of the resolved identities.
pub fn query_vector(terms: &[KeywordId]) -> TermVector {
    let mut vector = TermVector::new();
    for id in terms {
        *vector.entry(*id).or_insert(0.0) += 1.0;
    }
    vector
}

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^a-zA-Z-]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

pub fn stem(token: &str) -> String {
    STEMMER.stem(token).into_owned()
}

/// Reduce raw page text to lowercase ASCII words separated by single spaces.
///
/// Accents are decomposed first so "café" survives as "cafe"; every other run
/// of characters outside `[a-zA-Z-]` becomes a word break.
pub fn clean_text(raw: &str) -> String {
    let decomposed = raw.nfkd().collect::<String>();
    let replaced = NON_WORD.replace_all(&decomposed, " ");
    replaced
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip a single query token down to its lowercase letters and hyphens.
pub fn strip_token(token: &str) -> String {
    let decomposed = token.nfkd().collect::<String>();
    NON_WORD.replace_all(&decomposed, "").to_lowercase()
}

/// Stopword-filtered, stemmed terms of already cleaned text, in order.
pub fn analyze(cleaned: &str) -> Vec<String> {
    cleaned
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .map(stem)
        .filter(|term| !term.is_empty())
        .collect()
}

/// Canonical keyword text of a multi-word span: each word stripped,
/// stopwords dropped, the rest stemmed and joined with single spaces.
pub fn canonical_phrase<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|word| strip_token(word.as_ref()))
        .filter(|word| !word.is_empty() && !is_stopword(word))
        .map(|word| stem(&word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_analyze() {
        let terms = analyze(&clean_text("Running, runner's run!"));
        assert!(terms.iter().any(|t| t == "run"));
    }

    #[test]
    fn canonical_phrase_stems_each_word() {
        assert_eq!(canonical_phrase(&["Testing", "the", "Pages"]), "test page");
        assert_eq!(canonical_phrase(&["the", "of"]), "");
    }
}

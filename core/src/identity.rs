//! Stable 32-bit identities for URLs and keywords.
//!
//! Both namespaces use the IEEE CRC-32 of the UTF-8 bytes, the same checksum
//! zlib produces, so identities written by an earlier run stay valid. The
//! space is not collision free; two strings sharing an identity are treated
//! as the same page or keyword.

pub type PageId = u32;
pub type KeywordId = u32;

#[inline]
pub fn hash(text: &str) -> u32 {
    crc32fast::hash(text.as_bytes())
}

/// Identity of a page, computed over its normalized URL.
#[inline]
pub fn page_id(normalized_url: &str) -> PageId {
    hash(normalized_url)
}

/// Identity of a stemmed term or a stemmed, space-joined phrase.
#[inline]
pub fn keyword_id(keyword: &str) -> KeywordId {
    hash(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_zlib_checksum() {
        assert_eq!(hash("hello"), 907_060_870);
        assert_eq!(hash(""), 0);
    }

    #[test]
    fn deterministic_across_calls() {
        let url = "https://www.example.com/docs/intro";
        assert_eq!(page_id(url), page_id(url));
        assert_eq!(keyword_id("search engin"), keyword_id("search engin"));
        assert_ne!(page_id(url), page_id("https://www.example.com/docs"));
    }
}

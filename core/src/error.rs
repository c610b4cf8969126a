use crate::{Field, KeywordId};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An inverted-index row references a keyword the matching forward index never counted.
    #[error("keyword {keyword_id} has {field} inverted rows but no forward-index count")]
    MissingForwardEntry { keyword_id: KeywordId, field: Field },

    #[error("invalid phrase pattern: {0}")]
    Pattern(#[from] regex::Error),
}

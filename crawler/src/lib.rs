//! Breadth-first site crawler feeding the page store.
//!
//! - `fetch`: page-fetch collaborator trait and the HTTP implementation
//! - `robots`: robots.txt rules, cached per host
//! - `crawl`: URL normalization and the frontier loop

pub mod crawl;
pub mod fetch;
pub mod robots;

pub use crawl::{normalize_url, parse_seed, CrawlConfig, CrawlError, CrawlReport, Crawler};
pub use fetch::{extract_page, is_html, FetchError, FetchedPage, HttpFetcher, HttpFetcherConfig, PageFetcher, MAX_BODY_BYTES};

use crate::fetch::{FetchError, FetchedPage, PageFetcher};
use url::Url;
use search_core::identity::{self, PageId};
use search_core::{Page, Store};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid seed url {seed}: {reason}")]
    InvalidSeed { seed: String, reason: String },
    #[error(transparent)]
    Store(#[from] search_core::Error),
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Fetches allowed in flight at once.
    pub concurrency: usize,
    /// Stop dispatching new fetches after this many.
    pub max_pages: Option<usize>,
    /// Only enqueue links on the seed's host. Edges to other hosts are still recorded.
    pub same_host_only: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self { concurrency: 8, max_pages: None, same_host_only: true }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub fetched: usize,
    pub stored: usize,
    pub skipped_unchanged: usize,
    pub failed: usize,
    pub edges: usize,
}

/// Canonical page key: scheme, host, explicit port and path, with trailing
/// slashes stripped and query and fragment dropped. Page identities, edges
/// and the visited set are all keyed by it.
pub fn normalize_url(url: &Url) -> String {
    let mut key = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        key.push_str(&format!(":{port}"));
    }
    key.push_str(url.path());
    while key.ends_with('/') {
        key.pop();
    }
    key
}

/// Parses a seed, assuming `https://` when no scheme is given.
pub fn parse_seed(seed: &str) -> Result<Url, CrawlError> {
    let seed = seed.trim();
    let with_scheme = if seed.starts_with("http://") || seed.starts_with("https://") {
        seed.to_string()
    } else {
        format!("https://{seed}")
    };
    Url::parse(&with_scheme).map_err(|e| CrawlError::InvalidSeed { seed: seed.to_string(), reason: e.to_string() })
}

pub struct Crawler<F> {
    fetcher: Arc<F>,
    config: CrawlConfig,
}

/// Frontier state. Only the crawl loop touches it; fetch tasks just return results.
struct Walk {
    frontier: VecDeque<Url>,
    seen: HashSet<String>,
    edges: Vec<(PageId, PageId)>,
    seed_host: Option<String>,
    report: CrawlReport,
}

impl Walk {
    fn enqueue(&mut self, key: String) {
        if self.seen.contains(&key) {
            return;
        }
        if let Ok(url) = Url::parse(&key) {
            self.seen.insert(key);
            self.frontier.push_back(url);
        }
    }
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(fetcher: F, config: CrawlConfig) -> Self {
        Self { fetcher: Arc::new(fetcher), config }
    }

    /// Walks the link graph breadth first from `seed`, storing new or
    /// modified pages. Parent→child edges are written in one batch once the
    /// frontier is exhausted.
    ///
    /// A page whose stored timestamp is not older than the fetched one is left
    /// alone and its links are not followed. A newer page replaces the stored
    /// one, whose index rows and outbound edges go with it.
    ///
    /// A store error stops the crawl. Edges collected up to that point are
    /// written before the error is returned.
    pub async fn crawl(&self, store: &mut Store, seed: &str) -> Result<CrawlReport, CrawlError> {
        let seed = parse_seed(seed)?;
        let mut walk = Walk {
            frontier: VecDeque::new(),
            seen: HashSet::new(),
            edges: Vec::new(),
            seed_host: seed.host_str().map(str::to_string),
            report: CrawlReport::default(),
        };
        walk.enqueue(normalize_url(&seed));
        tracing::info!(seed = %seed, concurrency = self.config.concurrency, "crawl started");

        let mut inflight: JoinSet<(Url, Result<FetchedPage, FetchError>)> = JoinSet::new();
        let mut dispatched = 0usize;
        loop {
            while inflight.len() < self.config.concurrency.max(1)
                && self.config.max_pages.map_or(true, |max| dispatched < max)
            {
                let Some(url) = walk.frontier.pop_front() else { break };
                dispatched += 1;
                let fetcher = Arc::clone(&self.fetcher);
                inflight.spawn(async move {
                    let result = fetcher.fetch(&url).await;
                    (url, result)
                });
            }

            let Some(joined) = inflight.join_next().await else { break };
            match joined {
                Ok((url, Ok(page))) => {
                    walk.report.fetched += 1;
                    if let Err(err) = self.process(store, &mut walk, &url, page) {
                        // edges of pages already stored still belong in the graph
                        store.insert_edges(&walk.edges)?;
                        tracing::error!(url = %url, error = %err, edges = walk.edges.len(), "crawl aborted");
                        return Err(err);
                    }
                }
                Ok((url, Err(err))) => {
                    walk.report.failed += 1;
                    tracing::warn!(url = %url, error = %err, "fetch failed, skipping");
                }
                Err(err) => {
                    walk.report.failed += 1;
                    tracing::warn!(error = %err, "fetch task aborted");
                }
            }
            if walk.report.fetched > 0 && walk.report.fetched % 100 == 0 {
                tracing::info!(fetched = walk.report.fetched, frontier = walk.frontier.len(), "crawl progress");
            }
        }

        store.insert_edges(&walk.edges)?;
        walk.report.edges = walk.edges.len();
        tracing::info!(
            fetched = walk.report.fetched,
            stored = walk.report.stored,
            unchanged = walk.report.skipped_unchanged,
            failed = walk.report.failed,
            edges = walk.report.edges,
            "crawl finished"
        );
        Ok(walk.report)
    }

    fn process(&self, store: &Store, walk: &mut Walk, url: &Url, fetched: FetchedPage) -> Result<(), CrawlError> {
        let key = normalize_url(url);
        let page_id = identity::page_id(&key);

        if let Some(stored) = store.modified_at(page_id)? {
            if stored >= fetched.last_modified {
                walk.report.skipped_unchanged += 1;
                tracing::debug!(url = %key, "page unchanged, skipping");
                return Ok(());
            }
            store.delete_page(page_id)?;
            tracing::debug!(url = %key, "page modified, replacing");
        }

        let page = Page::new(key, fetched.title, &fetched.text, fetched.size, fetched.last_modified);
        store.insert_page(&page)?;
        walk.report.stored += 1;

        for link in &fetched.links {
            let Ok(child) = Url::parse(link) else { continue };
            let child_key = normalize_url(&child);
            walk.edges.push((page_id, identity::page_id(&child_key)));
            if self.config.same_host_only && child.host_str() != walk.seed_host.as_deref() {
                continue;
            }
            walk.enqueue(child_key);
        }
        Ok(())
    }
}

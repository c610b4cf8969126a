use crate::robots::RobotsCache;
use lazy_static::lazy_static;
use reqwest::{header, Client, Url};
use scraper::{Html, Selector};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::macros::format_description;
use time::PrimitiveDateTime;
use tokio::time::sleep;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref BODY: Selector = Selector::parse("body").expect("valid selector");
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// What the crawler needs from one fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub title: String,
    /// Visible text, one text node per line.
    pub text: String,
    /// Absolute http(s) targets of the page's anchors, in document order.
    pub links: Vec<String>,
    /// Unix seconds.
    pub last_modified: i64,
    pub size: i64,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
    #[error("{0} is disallowed by robots.txt")]
    Disallowed(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("{url} is {content_type}, not html")]
    NotHtml { url: String, content_type: String },
    #[error("{url} body exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

/// Bodies above this are dropped unread.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Only HTML is parsed. A missing Content-Type is given the benefit of the doubt.
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type.map_or(true, |ct| {
        let mime = ct.split(';').next().unwrap_or_default().trim();
        mime.eq_ignore_ascii_case("text/html") || mime.eq_ignore_ascii_case("application/xhtml+xml")
    })
}

/// Page-fetch collaborator: given a URL, the page's text, links, timestamp
/// and size, or an error the crawler logs and skips.
pub trait PageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub respect_robots: bool,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "site-search-bot/0.1".to_string(),
            timeout: Duration::from_secs(30),
            respect_robots: true,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    robots: Option<Arc<RobotsCache>>,
}

impl HttpFetcher {
    pub fn new(config: &HttpFetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()?;
        let robots = config.respect_robots.then(|| Arc::new(RobotsCache::new()));
        Ok(Self { client, robots })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if url.host_str().is_none() || !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        if let Some(robots) = &self.robots {
            if !robots.allowed(&self.client, url).await {
                return Err(FetchError::Disallowed(url.to_string()));
            }
            if let Some(delay) = robots.delay_ms(url) {
                sleep(Duration::from_millis(delay)).await;
            }
        }

        let mut resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }
        let headers = resp.headers();
        let last_modified = headers
            .get(header::LAST_MODIFIED)
            .or_else(|| headers.get(header::DATE))
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
            .unwrap_or_else(|| time::OffsetDateTime::now_utc().unix_timestamp());
        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok());
        let content_type = headers.get(header::CONTENT_TYPE).map(|v| v.to_str().unwrap_or("invalid").to_string());
        if !is_html(content_type.as_deref()) {
            return Err(FetchError::NotHtml { url: url.to_string(), content_type: content_type.unwrap_or_default() });
        }
        let too_large = || FetchError::TooLarge { url: url.to_string(), limit: MAX_BODY_BYTES };
        if content_length.is_some_and(|len| len > MAX_BODY_BYTES as i64) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        let size = content_length.unwrap_or(body.len() as i64);
        let html = String::from_utf8_lossy(&body);
        Ok(extract_page(url, &html, last_modified, size))
    }
}

/// Title, visible text and outbound links of an HTML document.
pub fn extract_page(url: &Url, html: &str, last_modified: i64, size: i64) -> FetchedPage {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title".to_string());
    let text = match doc.select(&BODY).next() {
        Some(body) => body.text().map(str::trim).filter(|t| !t.is_empty()).collect::<Vec<_>>().join("\n"),
        None => doc.root_element().text().map(str::trim).filter(|t| !t.is_empty()).collect::<Vec<_>>().join("\n"),
    };
    let links = doc
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| Url::parse(href).or_else(|_| url.join(href)).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(String::from)
        .collect();
    FetchedPage { title, text, links, last_modified, size }
}

/// Parses an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`) into unix seconds.
pub fn parse_http_date(value: &str) -> Option<i64> {
    let format = format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");
    PrimitiveDateTime::parse(value.trim(), &format).ok().map(|dt| dt.assume_utc().unix_timestamp())
}

use parking_lot::RwLock;
use reqwest::{Client, Url};
use std::collections::HashMap;

/// Rules of the `*` group of one host's robots.txt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Robots {
    pub allows: Vec<String>,
    pub disallows: Vec<String>,
    pub crawl_delay_ms: Option<u64>,
}

impl Robots {
    pub fn parse(txt: &str) -> Self {
        let mut active = false;
        let mut robots = Robots::default();
        for line in txt.lines() {
            let l = line.trim();
            if l.is_empty() || l.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = l.split_once(':') {
                let key = k.trim().to_lowercase();
                let val = v.trim();
                match key.as_str() {
                    "user-agent" => active = val == "*",
                    "allow" if active && !val.is_empty() => robots.allows.push(val.to_string()),
                    "disallow" if active && !val.is_empty() => robots.disallows.push(val.to_string()),
                    "crawl-delay" if active => {
                        if let Ok(n) = val.parse::<f64>() {
                            robots.crawl_delay_ms = Some((n * 1000.0) as u64);
                        }
                    }
                    _ => {}
                }
            }
        }
        robots
    }

    /// Longest matching rule wins; ties go to Allow.
    pub fn allows_path(&self, path: &str) -> bool {
        let longest = |rules: &[String]| rules.iter().filter(|r| path.starts_with(r.as_str())).map(String::len).max();
        match (longest(&self.allows), longest(&self.disallows)) {
            (Some(a), Some(d)) => a >= d,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}

/// Host → parsed robots.txt, fetched lazily on first use.
#[derive(Default)]
pub struct RobotsCache {
    hosts: RwLock<HashMap<String, Robots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn allowed(&self, client: &Client, url: &Url) -> bool {
        let Some(host) = url.host_str().map(str::to_string) else { return false };
        let cached = self.hosts.read().get(&host).cloned();
        let rules = match cached {
            Some(rules) => rules,
            None => {
                let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);
                let txt = match client.get(&robots_url).send().await {
                    Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
                    _ => String::new(),
                };
                let parsed = Robots::parse(&txt);
                self.hosts.write().insert(host, parsed.clone());
                parsed
            }
        };
        rules.allows_path(url.path())
    }

    pub fn delay_ms(&self, url: &Url) -> Option<u64> {
        let host = url.host_str()?;
        self.hosts.read().get(host).and_then(|r| r.crawl_delay_ms)
    }
}

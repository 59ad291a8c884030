// Content matching: candidate URLs from catalog offers or provider search
// pages, and a word-overlap scorer to pick the best one.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

use crate::models::{CatalogItem, Provider};

const SVT_PLAY_BASE: &str = "https://www.svtplay.se";
const NRK_TV_BASE: &str = "https://tv.nrk.no";
const DIRECT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const DIRECT_SEARCH_LIMIT: usize = 5;
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

static RE_SVT_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(/video/[^"]+)""#).unwrap());
static RE_NRK_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(/serie/[^"]+|/program/[^"]+)""#).unwrap());

static SVT_DOMAINS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)svtplay\.se", r"(?i)svt\.se/video", r"(?i)oppetarkiv\.se"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});
static NRK_DOMAINS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)nrk\.no", r"(?i)tv\.nrk\.no"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// A candidate URL with its title-word overlap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredUrl {
    pub score: usize,
    pub url: String,
}

/// Scrapes provider search pages when the catalogs come up empty
pub struct ContentMatcher {
    client: Client,
    svt_base: String,
    nrk_base: String,
}

impl ContentMatcher {
    pub fn new() -> Result<Self> {
        Self::with_bases(SVT_PLAY_BASE, NRK_TV_BASE)
    }

    /// Point direct search at other hosts (used by tests)
    pub fn with_bases(svt_base: &str, nrk_base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(DIRECT_SEARCH_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .context("Failed to build direct search HTTP client")?;

        Ok(Self {
            client,
            svt_base: svt_base.trim_end_matches('/').to_string(),
            nrk_base: nrk_base.trim_end_matches('/').to_string(),
        })
    }

    /// Search the provider's own site for `title`.
    /// Returns at most five absolute URLs; any failure yields an empty list.
    pub async fn find_direct_urls(&self, title: &str, provider: Provider) -> Vec<String> {
        match self.search_direct(title, provider).await {
            Ok(urls) => {
                tracing::debug!(
                    "{} direct search for '{}' found {} URLs",
                    provider.display_name(),
                    title,
                    urls.len()
                );
                urls
            }
            Err(e) => {
                tracing::error!("{} direct search error: {:#}", provider.display_name(), e);
                Vec::new()
            }
        }
    }

    async fn search_direct(&self, title: &str, provider: Provider) -> Result<Vec<String>> {
        let (base, pattern) = match provider {
            Provider::Svt => (&self.svt_base, &*RE_SVT_HREF),
            Provider::Nrk => (&self.nrk_base, &*RE_NRK_HREF),
        };
        let search_url = format!("{}/sok?q={}", base, search_query(title));

        let response = self
            .client
            .get(&search_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", search_url))?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!(
                "{} search page returned {}",
                provider.display_name(),
                response.status()
            );
            return Ok(Vec::new());
        }

        let html = response
            .text()
            .await
            .context("Failed to read search page body")?;

        Ok(extract_hrefs(&html, pattern, base))
    }
}

/// Title as a search query: words percent-encoded and joined with '+'
fn search_query(title: &str) -> String {
    title
        .split(' ')
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

fn extract_hrefs(html: &str, pattern: &Regex, base: &str) -> Vec<String> {
    pattern
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .take(DIRECT_SEARCH_LIMIT)
        .map(|m| format!("{}{}", base, m.as_str()))
        .collect()
}

/// Collect standard web URLs from offers whose provider id contains
/// `provider_name` (case-insensitive), in item then offer order.
pub fn extract_urls_from_catalog(items: &[CatalogItem], provider_name: &str) -> Vec<String> {
    let needle = provider_name.to_lowercase();

    items
        .iter()
        .flat_map(|item| item.offers.iter())
        .filter(|offer| offer.provider_id.to_lowercase().contains(&needle))
        .filter_map(|offer| offer.urls.standard_web.clone())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Whether `url` belongs to one of the provider's known domains
pub fn validate_url(url: &str, provider: Provider) -> bool {
    let patterns = match provider {
        Provider::Svt => &*SVT_DOMAINS,
        Provider::Nrk => &*NRK_DOMAINS,
    };
    patterns.iter().any(|re| re.is_match(url))
}

/// Score every URL by how many title words it contains.
/// Sorted best first; equal scores keep their input order.
pub fn score_urls(urls: &[String], title: &str) -> Vec<ScoredUrl> {
    let lowered = title.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();

    let mut scored: Vec<ScoredUrl> = urls
        .iter()
        .map(|url| {
            let url_lower = url.to_lowercase();
            ScoredUrl {
                score: words.iter().filter(|w| url_lower.contains(*w)).count(),
                url: url.clone(),
            }
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Highest-scoring URL for `title`. A zero score still wins when nothing better exists.
pub fn get_best_match_url(urls: &[String], title: &str) -> Option<String> {
    score_urls(urls, title).into_iter().next().map(|s| s.url)
}

use super::util::with_retry;
use crate::core::cache::Cache;
use crate::core::fund::{FundDataProvider, FundDetails, FundMeta, FundSummary, NavPoint};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

/// Client for an mfapi.in compatible mutual fund API.
pub struct MfApiProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<Cache<String, FundDetails>>,
}

impl MfApiProvider {
    pub fn new(base_url: &str, cache: Arc<Cache<String, FundDetails>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mfbook/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache,
        })
    }

    async fn get_text(&self, url: Url, what: &str) -> Result<String> {
        debug!("Requesting {} from {}", what, url);
        let response = with_retry(|| self.client.get(url.clone()).send(), 3, 500)
            .await
            .with_context(|| format!("Failed to send request for {what}"))?;

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for {what}"))?;

        if text.trim().is_empty() {
            return Err(anyhow!("Received empty response for {}", what));
        }
        Ok(text)
    }

    /// `{base_url}/mf/{scheme_code}` with the code as a single escaped segment.
    fn details_url(&self, scheme_code: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/mf", self.base_url))
            .with_context(|| format!("Invalid fund API base url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid fund API base url: {}", self.base_url))?
            .push(scheme_code);
        Ok(url)
    }
}

/// mfapi serves scheme codes as numbers in most places and as strings in a few.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SchemeCode {
    Number(u64),
    Text(String),
}

impl Display for SchemeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemeCode::Number(n) => write!(f, "{n}"),
            SchemeCode::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchEntry {
    scheme_code: SchemeCode,
    scheme_name: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    meta: Option<MetaEntry>,
    #[serde(default)]
    data: Vec<NavEntry>,
}

#[derive(Debug, Deserialize)]
struct MetaEntry {
    fund_house: Option<String>,
    scheme_type: Option<String>,
    scheme_category: Option<String>,
    scheme_code: Option<SchemeCode>,
    scheme_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NavEntry {
    date: String,
    nav: String,
}

impl NavEntry {
    fn parse(&self) -> Option<NavPoint> {
        let date = NaiveDate::parse_from_str(&self.date, "%d-%m-%Y").ok()?;
        let nav = self.nav.trim().parse::<f64>().ok()?;
        Some(NavPoint { date, nav })
    }
}

#[async_trait]
impl FundDataProvider for MfApiProvider {
    async fn search(&self, query: &str) -> Result<Vec<FundSummary>> {
        let query = query.trim();
        let url = if query.is_empty() {
            Url::parse(&format!("{}/mf", self.base_url))
        } else {
            Url::parse_with_params(&format!("{}/mf/search", self.base_url), &[("q", query)])
        }
        .with_context(|| format!("Invalid fund API base url: {}", self.base_url))?;

        let what = format!("search '{query}'");
        let text = self.get_text(url, &what).await?;
        let entries: Vec<SearchEntry> = serde_json::from_str(&text).with_context(|| {
            format!("Failed to parse search response for '{query}'. Response: '{text}'")
        })?;

        debug!("Search '{}' returned {} funds", query, entries.len());
        Ok(entries
            .into_iter()
            .map(|e| FundSummary {
                scheme_code: e.scheme_code.to_string(),
                scheme_name: e.scheme_name,
            })
            .collect())
    }

    async fn details(&self, scheme_code: &str) -> Result<FundDetails> {
        if let Some(cached) = self.cache.get(&scheme_code.to_string()).await {
            return Ok(cached);
        }

        let url = self.details_url(scheme_code)?;
        let what = format!("scheme code: {scheme_code}");
        let text = self.get_text(url, &what).await?;

        let response: DetailsResponse = serde_json::from_str(&text).with_context(|| {
            format!("Failed to parse fund details for scheme code: {scheme_code}. Response: '{text}'")
        })?;

        let meta = response
            .meta
            .and_then(|m| {
                Some(FundMeta {
                    scheme_code: m.scheme_code?.to_string(),
                    scheme_name: m.scheme_name?,
                    fund_house: m.fund_house,
                    scheme_type: m.scheme_type,
                    scheme_category: m.scheme_category,
                })
            })
            .ok_or_else(|| anyhow!("Fund not found for scheme code: {}", scheme_code))?;

        let mut history: Vec<NavPoint> = response.data.iter().filter_map(NavEntry::parse).collect();
        let skipped = response.data.len() - history.len();
        if skipped > 0 {
            debug!("Skipped {} unparsable NAV points for {}", skipped, scheme_code);
        }
        history.sort_by(|a, b| b.date.cmp(&a.date));
        history.dedup_by_key(|p| p.date);

        let details = FundDetails { meta, history };
        self.cache
            .put(scheme_code.to_string(), details.clone())
            .await;
        Ok(details)
    }
}

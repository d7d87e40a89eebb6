use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{CandidateSource, summarize};
use crate::models::Candidate;
use crate::sports::SportProfile;
use crate::utils::clean_html_tags;
use crate::window::RecencyWindow;

pub const DEFAULT_ENDPOINT: &str = "https://content.guardianapis.com/search";
const SOURCE_LABEL: &str = "The Guardian";

#[derive(Debug, Deserialize)]
struct Envelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    web_title: String,
    web_url: String,
    web_publication_date: Option<String>,
    fields: Option<Fields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fields {
    thumbnail: Option<String>,
    trail_text: Option<String>,
}

/// Keyword search against the Guardian content API.
pub struct GuardianSearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    section: Option<String>,
    region_terms: Option<String>,
    page_size: u32,
}

impl GuardianSearch {
    pub fn new(
        timeout: Duration,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        page_size: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Guardian client")?;

        Ok(GuardianSearch {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            section: Some("sport".to_string()),
            region_terms: None,
            page_size,
        })
    }

    pub fn with_section(mut self, section: Option<String>) -> Self {
        self.section = section.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_region_terms(mut self, region_terms: Option<String>) -> Self {
        self.region_terms = region_terms.filter(|r| !r.trim().is_empty());
        self
    }

    async fn search(&self, profile: &SportProfile, window: &RecencyWindow) -> Result<Vec<Candidate>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("no guardian_api_key configured"))?;

        let query = build_query(&profile.query, self.region_terms.as_deref());
        let mut params = vec![
            ("q", query),
            ("from-date", window.from_date()),
            ("to-date", window.to_date()),
            ("page-size", self.page_size.to_string()),
            ("order-by", "newest".to_string()),
            ("show-fields", "thumbnail,trailText".to_string()),
        ];
        if let Some(section) = &self.section {
            params.push(("section", section.clone()));
        }

        debug!("Guardian search for {} with {:?}", profile.sport, params);
        let body = self
            .client
            .get(&self.endpoint)
            .header("api-key", api_key)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_results(&body)
    }
}

#[async_trait]
impl CandidateSource for GuardianSearch {
    async fn fetch(&self, profile: &SportProfile, window: &RecencyWindow) -> Vec<Candidate> {
        match self.search(profile, window).await {
            Ok(candidates) => {
                info!("Guardian returned {} {} stories", candidates.len(), profile.sport);
                candidates
            }
            Err(e) => {
                warn!("Guardian search for {} failed: {e:#}", profile.sport);
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "guardian"
    }
}

/// Sport terms, narrowed by region terms when configured.
pub fn build_query(sport_terms: &str, region_terms: Option<&str>) -> String {
    match region_terms.map(str::trim).filter(|r| !r.is_empty()) {
        Some(region) => format!("({}) AND ({})", sport_terms.trim(), region),
        None => sport_terms.trim().to_string(),
    }
}

fn parse_results(body: &str) -> Result<Vec<Candidate>> {
    let envelope: Envelope =
        serde_json::from_str(body).context("Failed to parse Guardian search response")?;
    if envelope.response.status != "ok" {
        bail!("Guardian answered with status {}", envelope.response.status);
    }

    let candidates = envelope
        .response
        .results
        .into_iter()
        .filter_map(|r| {
            let title = clean_html_tags(&r.web_title);
            if title.is_empty() || r.web_url.trim().is_empty() {
                return None;
            }
            let published_at = r
                .web_publication_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc));
            let fields = r.fields.unwrap_or_default();

            Some(Candidate {
                title,
                url: r.web_url,
                published_at,
                image: fields.thumbnail.filter(|t| !t.trim().is_empty()),
                summary: summarize(fields.trail_text.as_deref()),
                source: SOURCE_LABEL.to_string(),
            })
        })
        .collect();

    Ok(candidates)
}

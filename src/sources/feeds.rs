use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::Client;
use rss::{Channel, Item};
use std::time::Duration;
use url::Url;

use super::{CandidateSource, summarize};
use crate::models::Candidate;
use crate::sports::SportProfile;
use crate::utils::clean_html_tags;
use crate::window::RecencyWindow;

/// Reads every RSS feed configured for a sport.
pub struct FeedReader {
    client: Client,
}

impl FeedReader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build feed client")?;
        Ok(FeedReader { client })
    }

    async fn read_feed(&self, feed_url: &str) -> Result<Vec<Candidate>> {
        let bytes = self
            .client
            .get(feed_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let channel = Channel::read_from(&bytes[..])
            .with_context(|| format!("Failed to parse feed {feed_url}"))?;
        Ok(parse_channel(&channel, feed_url))
    }
}

#[async_trait]
impl CandidateSource for FeedReader {
    async fn fetch(&self, profile: &SportProfile, _window: &RecencyWindow) -> Vec<Candidate> {
        let reads = profile.feeds.iter().map(|feed| async move {
            match self.read_feed(feed).await {
                Ok(items) => {
                    debug!("Feed {feed} gave {} items", items.len());
                    items
                }
                Err(e) => {
                    warn!("Skipping feed {feed}: {e:#}");
                    Vec::new()
                }
            }
        });

        // join_all keeps feed order, so the first configured feed still leads
        let candidates: Vec<Candidate> = join_all(reads).await.into_iter().flatten().collect();
        info!(
            "{} feeds returned {} {} stories",
            profile.feeds.len(),
            candidates.len(),
            profile.sport
        );
        candidates
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

/// Normalize a parsed channel into candidates. Items without a title or link
/// are dropped.
pub fn parse_channel(channel: &Channel, feed_url: &str) -> Vec<Candidate> {
    let source = source_label(channel, feed_url);

    channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = clean_html_tags(item.title()?);
            let link = item.link()?.trim();
            if title.is_empty() || link.is_empty() {
                return None;
            }

            Some(Candidate {
                title,
                url: link.to_string(),
                published_at: published_at(item),
                image: item_image(item),
                summary: summarize(item.description()),
                source: source.clone(),
            })
        })
        .collect()
}

fn source_label(channel: &Channel, feed_url: &str) -> String {
    let title = clean_html_tags(channel.title());
    if !title.is_empty() {
        return title;
    }
    Url::parse(feed_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| "RSS".to_string())
}

fn published_at(item: &Item) -> Option<DateTime<Utc>> {
    let from_pub_date = item
        .pub_date()
        .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok());
    let from_dc_date = || {
        item.dublin_core_ext()?
            .dates()
            .iter()
            .find_map(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
    };

    from_pub_date.or_else(from_dc_date).map(|d| d.with_timezone(&Utc))
}

/// Enclosure first, then `media:content`, then `media:thumbnail`.
fn item_image(item: &Item) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    let enclosure = item.enclosure().and_then(|e| non_empty(e.url()));
    let media = |name: &str| {
        item.extensions()
            .get("media")?
            .get(name)?
            .iter()
            .find_map(|ext| ext.attrs().get("url").and_then(|u| non_empty(u.as_str())))
    };

    enclosure
        .or_else(|| media("content"))
        .or_else(|| media("thumbnail"))
}

use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, header::CONTENT_TYPE};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::models::ValidatedImage;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13.5; rv:116.0) Gecko/20100101 Firefox/116.0";

/// File extensions an image URL may end in. Extensionless CDN paths are allowed.
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "avif", "bmp"];

/// Preview-image meta keys, in the order we trust them.
const OG_KEYS: [&str; 3] = ["og:image", "og:image:secure_url", "twitter:image"];

/// Confirms image URLs are live and actually serve an image.
#[derive(Clone)]
pub struct ImageValidator {
    client: Client,
    blocked_hosts: Vec<String>,
}

impl ImageValidator {
    pub fn new(timeout: Duration, max_redirects: usize, blocked_hosts: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build image probe client")?;

        Ok(ImageValidator {
            client,
            blocked_hosts: blocked_hosts
                .into_iter()
                .map(|h| h.trim().trim_start_matches('.').to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        })
    }

    /// HEAD the URL and accept it only if it answers below 400 with an
    /// `image/*` content type. Every failure ends up as `None`.
    pub async fn validate(&self, raw: &str) -> Option<ValidatedImage> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                debug!("Rejecting image {raw}: {e}");
                return None;
            }
        };
        if !self.is_allowed(&url) {
            debug!("Rejecting image {url}: scheme, host or extension not allowed");
            return None;
        }

        match self.probe(&url).await {
            Ok(true) => Some(ValidatedImage::new(url)),
            Ok(false) => None,
            Err(e) => {
                debug!("Image probe failed for {url}: {e:#}");
                None
            }
        }
    }

    /// Scrape the article page for its preview image, then validate that.
    pub async fn validate_from_page(&self, page_url: &str) -> Option<ValidatedImage> {
        let og = self.og_image(page_url).await?;
        debug!("Found preview image {og} on {page_url}");
        self.validate(og.as_str()).await
    }

    pub async fn og_image(&self, page_url: &str) -> Option<Url> {
        let base = Url::parse(page_url.trim()).ok()?;
        match self.fetch_page(&base).await {
            Ok(html) => extract_og_image(&html, &base),
            Err(e) => {
                debug!("Could not fetch article page {base}: {e:#}");
                None
            }
        }
    }

    fn is_allowed(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str().map(str::to_lowercase) else {
            return false;
        };
        let blocked = self
            .blocked_hosts
            .iter()
            .any(|blocked| host == *blocked || host.ends_with(&format!(".{blocked}")));
        !blocked && has_image_extension(url)
    }

    async fn probe(&self, url: &Url) -> Result<bool> {
        let res = self.client.head(url.clone()).send().await?;

        let status = res.status();
        if status.as_u16() >= 400 {
            debug!("Image {url} answered {status}");
            return Ok(false);
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        if content_type.starts_with("image/") {
            Ok(true)
        } else {
            debug!("Image {url} has content type {content_type:?}");
            Ok(false)
        }
    }

    async fn fetch_page(&self, url: &Url) -> Result<String> {
        let body = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

fn has_image_extension(url: &Url) -> bool {
    let file = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    match file.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => true,
    }
}

/// Pull the social-preview image out of an article's HTML, resolved against
/// the page URL.
pub fn extract_og_image(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let meta_selector = Selector::parse("meta").ok()?;

    let mut metadata: HashMap<String, String> = HashMap::new();
    for tag in document.select(&meta_selector) {
        let key = tag
            .value()
            .attr("property")
            .or_else(|| tag.value().attr("name"))
            .map(|k| k.trim().to_lowercase());
        let content = tag.value().attr("content").unwrap_or("").trim();

        if let Some(key) = key {
            if OG_KEYS.contains(&key.as_str()) && !content.is_empty() {
                metadata.entry(key).or_insert_with(|| content.to_string());
            }
        }
    }

    OG_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(|value| base.join(value).ok())
}

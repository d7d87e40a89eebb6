use anyhow::{Result, ensure};
use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info};

use crate::caption::{build_caption, build_hashtags, human_when};
use crate::image::ImageValidator;
use crate::models::{Candidate, Post, PostData, Sport, ValidatedImage};
use crate::sources::CandidateSource;
use crate::sports::{SportCatalog, SportProfile};
use crate::window::RecencyWindow;

/// Turns a sport into either a publishable post or a reason not to post.
///
/// Holds no state between runs: every call recomputes the window and
/// refetches its candidates.
pub struct Pipeline {
    catalog: SportCatalog,
    primary: Box<dyn CandidateSource>,
    fallback: Box<dyn CandidateSource>,
    images: ImageValidator,
    window_days: i64,
}

impl Pipeline {
    pub fn new(
        catalog: SportCatalog,
        primary: Box<dyn CandidateSource>,
        fallback: Box<dyn CandidateSource>,
        images: ImageValidator,
        window_days: i64,
    ) -> Self {
        Pipeline {
            catalog,
            primary,
            fallback,
            images,
            window_days,
        }
    }

    pub fn catalog(&self) -> &SportCatalog {
        &self.catalog
    }

    pub async fn post_data(&self, sport: Sport, now: DateTime<FixedOffset>) -> PostData {
        let Some(profile) = self.catalog.profile(sport) else {
            return PostData::skip(sport, format!("no source profile configured for {sport}"));
        };
        let window = RecencyWindow::new(now, self.window_days);

        let candidates = self.gather(profile, &window).await;
        if candidates.is_empty() {
            return PostData::skip(
                sport,
                format!(
                    "no {sport} stories from {} or {}",
                    self.primary.name(),
                    self.fallback.name()
                ),
            );
        }

        let seen = candidates.len();
        let fresh: Vec<(Candidate, DateTime<Utc>)> = window
            .retain_fresh(candidates)
            .into_iter()
            .filter_map(|c| c.published_at.map(|ts| (c, ts)))
            .collect();
        debug!("{} of {seen} {sport} candidates are fresh", fresh.len());

        if fresh.is_empty() {
            return PostData::skip(
                sport,
                format!(
                    "no fresh {sport} story within the last {} days ({seen} candidates were older or undated)",
                    window.days
                ),
            );
        }

        for (candidate, published_at) in &fresh {
            let Some(declared) = candidate.image.as_deref() else {
                continue;
            };
            if let Some(image) = self.images.validate(declared).await {
                info!("Using declared image of \"{}\"", candidate.title);
                return PostData::Post(assemble(profile, candidate, *published_at, image, window.now));
            }
            debug!("Declared image {declared} of \"{}\" did not validate", candidate.title);
        }

        for (candidate, published_at) in &fresh {
            if let Some(image) = self.images.validate_from_page(&candidate.url).await {
                info!("Using preview image scraped from {}", candidate.url);
                return PostData::Post(assemble(profile, candidate, *published_at, image, window.now));
            }
        }

        PostData::skip(
            sport,
            format!(
                "none of the {} fresh {sport} stories had a working image, article previews included",
                fresh.len()
            ),
        )
    }

    /// Try each sport in order and return the first one that can post.
    pub async fn first_postable(&self, sports: &[Sport], now: DateTime<FixedOffset>) -> Result<PostData> {
        ensure!(!sports.is_empty(), "no sports to try");

        let mut reasons = Vec::with_capacity(sports.len());
        for &sport in sports {
            let data = self.post_data(sport, now).await;
            if data.should_post() {
                return Ok(data);
            }
            if let PostData::Skip { reason, .. } = data {
                info!("[SKIP] {sport}: {reason}");
                reasons.push(format!("{sport}: {reason}"));
            }
        }

        let last = sports[sports.len() - 1];
        Ok(PostData::skip(last, reasons.join("; ")))
    }

    async fn gather(&self, profile: &SportProfile, window: &RecencyWindow) -> Vec<Candidate> {
        let primary = self.primary.fetch(profile, window).await;
        if !primary.is_empty() {
            return primary;
        }
        info!(
            "{} had nothing for {}, trying {}",
            self.primary.name(),
            profile.sport,
            self.fallback.name()
        );
        self.fallback.fetch(profile, window).await
    }
}

fn assemble(
    profile: &SportProfile,
    candidate: &Candidate,
    published_at: DateTime<Utc>,
    image: ValidatedImage,
    now: DateTime<FixedOffset>,
) -> Post {
    let when_text = human_when(published_at, now);
    let caption = build_caption(profile.sport, &candidate.title, &candidate.source, &when_text);
    let hashtags = build_hashtags(&profile.tags, &candidate.title);

    Post {
        sport: profile.sport,
        title: candidate.title.clone(),
        url: candidate.url.clone(),
        image,
        published_at,
        source: candidate.source.clone(),
        when_text,
        summary: candidate.summary.clone(),
        caption,
        hashtags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, status_only, with_content_type};
    use async_trait::async_trait;
    use axum::{Router, response::Html, routing::get};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        items: Vec<Candidate>,
        calls: Arc<AtomicUsize>,
    }

    impl Canned {
        fn new(items: Vec<Candidate>) -> (Box<dyn CandidateSource>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Canned {
                items,
                calls: calls.clone(),
            };
            (Box::new(source), calls)
        }
    }

    #[async_trait]
    impl CandidateSource for Canned {
        async fn fetch(&self, _profile: &SportProfile, _window: &RecencyWindow) -> Vec<Candidate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.items.clone()
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 18, 12, 0, 0)
            .unwrap()
    }

    fn hours_ago(h: i64) -> Option<DateTime<Utc>> {
        Some(now().with_timezone(&Utc) - Duration::hours(h))
    }

    fn story(base: &str, slug: &str, image: Option<&str>, age_hours: i64) -> Candidate {
        Candidate {
            title: format!("Team Alpha vs Team Beta {slug}"),
            url: format!("{base}/article/{slug}"),
            published_at: hours_ago(age_hours),
            image: image.map(|i| format!("{base}{i}")),
            summary: Some(format!("summary of {slug}")),
            source: "Example Sport".to_string(),
        }
    }

    fn catalog() -> SportCatalog {
        let profile = |sport: Sport, tags: &[&str]| SportProfile {
            sport,
            query: sport.label().to_string(),
            feeds: vec![],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            weight: 1,
        };
        SportCatalog::new(vec![
            profile(Sport::Soccer, &["#Football", "#UEFA"]),
            profile(Sport::Golf, &["#Golf"]),
        ])
    }

    async fn web() -> String {
        let app = Router::new()
            .route("/img/live.jpg", with_content_type("image/jpeg"))
            .route("/img/og.jpg", with_content_type("image/png"))
            .route("/img/dead.jpg", status_only(404))
            .route("/img/page.jpg", with_content_type("text/html"))
            .route(
                "/article/with-og",
                get(|| async {
                    Html(r#"<html><head><meta property="og:image" content="/img/og.jpg"></head><body></body></html>"#)
                }),
            )
            .route(
                "/article/dead-og",
                get(|| async {
                    Html(r#"<html><head><meta property="og:image" content="/img/dead.jpg"></head></html>"#)
                }),
            )
            .route("/article/plain", get(|| async { Html("<html><body>text</body></html>") }));
        serve(app).await
    }

    fn pipeline(primary: Box<dyn CandidateSource>, fallback: Box<dyn CandidateSource>) -> Pipeline {
        let images = ImageValidator::new(std::time::Duration::from_secs(2), 3, vec![]).unwrap();
        Pipeline::new(catalog(), primary, fallback, images, 2)
    }

    fn expect_post(data: PostData) -> Post {
        match data {
            PostData::Post(post) => post,
            PostData::Skip { reason, .. } => panic!("expected a post, got skip: {reason}"),
        }
    }

    #[tokio::test]
    async fn primary_hit_with_live_image_posts() {
        let base = web().await;
        let (primary, _) = Canned::new(vec![story(&base, "plain", Some("/img/live.jpg"), 2)]);
        let (fallback, fallback_calls) = Canned::new(vec![]);

        let post = expect_post(pipeline(primary, fallback).post_data(Sport::Soccer, now()).await);
        assert_eq!(post.image.as_str(), format!("{base}/img/live.jpg"));
        assert!(post.caption.starts_with("Team Alpha vs Team Beta plain"));
        assert_eq!(post.caption, "Team Alpha vs Team Beta plain • Example Sport (2h ago)");
        assert_eq!(post.when_text, "2h ago");
        assert_eq!(post.hashtag_line(), "#Football #UEFA #TeamAlpha #TeamBeta");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_feeds_and_skips_dead_image() {
        let base = web().await;
        let (primary, primary_calls) = Canned::new(vec![]);
        let (fallback, fallback_calls) = Canned::new(vec![
            story(&base, "dead-og", Some("/img/dead.jpg"), 3),
            story(&base, "plain", Some("/img/live.jpg"), 5),
        ]);

        let post = expect_post(pipeline(primary, fallback).post_data(Sport::Soccer, now()).await);
        assert_eq!(post.url, format!("{base}/article/plain"));
        assert_eq!(post.image.as_str(), format!("{base}/img/live.jpg"));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scrapes_preview_image_when_declared_ones_are_dead() {
        let base = web().await;
        let (primary, _) = Canned::new(vec![
            story(&base, "plain", Some("/img/dead.jpg"), 1),
            story(&base, "dead-og", None, 2),
            story(&base, "with-og", Some("/img/page.jpg"), 3),
        ]);
        let (fallback, _) = Canned::new(vec![]);

        let post = expect_post(pipeline(primary, fallback).post_data(Sport::Soccer, now()).await);
        assert_eq!(post.url, format!("{base}/article/with-og"));
        assert_eq!(post.image.as_str(), format!("{base}/img/og.jpg"));
    }

    #[tokio::test]
    async fn nothing_fresh_skips_with_reason() {
        let base = web().await;
        let mut undated = story(&base, "plain", Some("/img/live.jpg"), 1);
        undated.published_at = None;
        let (primary, _) = Canned::new(vec![
            story(&base, "plain", Some("/img/live.jpg"), 24 * 4),
            undated,
        ]);
        let (fallback, _) = Canned::new(vec![]);

        let data = pipeline(primary, fallback).post_data(Sport::Soccer, now()).await;
        match data {
            PostData::Skip { sport, reason } => {
                assert_eq!(sport, Sport::Soccer);
                assert!(reason.contains("no fresh Soccer story within the last 2 days"), "{reason}");
            }
            PostData::Post(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn first_fresh_candidate_with_working_image_wins() {
        let base = web().await;
        let (primary, _) = Canned::new(vec![
            story(&base, "first", Some("/img/live.jpg"), 6),
            story(&base, "second", Some("/img/og.jpg"), 1),
        ]);
        let (fallback, _) = Canned::new(vec![]);

        let post = expect_post(pipeline(primary, fallback).post_data(Sport::Soccer, now()).await);
        assert_eq!(post.url, format!("{base}/article/first"));
    }

    #[tokio::test]
    async fn distinct_reasons_for_each_dead_end() {
        let base = web().await;

        let (primary, _) = Canned::new(vec![]);
        let (fallback, _) = Canned::new(vec![]);
        let p = pipeline(primary, fallback);
        let PostData::Skip { reason: empty, .. } = p.post_data(Sport::Soccer, now()).await else {
            panic!("expected skip");
        };
        assert_eq!(empty, "no Soccer stories from canned or canned");

        let PostData::Skip { reason: missing, .. } = p.post_data(Sport::Tennis, now()).await else {
            panic!("expected skip");
        };
        assert_eq!(missing, "no source profile configured for Tennis");

        let (primary, _) = Canned::new(vec![
            story(&base, "plain", Some("/img/dead.jpg"), 1),
            story(&base, "dead-og", Some("/img/page.jpg"), 2),
        ]);
        let (fallback, _) = Canned::new(vec![]);
        let PostData::Skip { reason: no_image, .. } =
            pipeline(primary, fallback).post_data(Sport::Soccer, now()).await
        else {
            panic!("expected skip");
        };
        assert!(no_image.contains("none of the 2 fresh Soccer stories had a working image"));
    }

    #[tokio::test]
    async fn priority_list_returns_first_postable_sport() {
        let base = web().await;
        let (primary, _) = Canned::new(vec![story(&base, "plain", Some("/img/live.jpg"), 2)]);
        let (fallback, _) = Canned::new(vec![]);
        let p = pipeline(primary, fallback);

        let data = p
            .first_postable(&[Sport::Tennis, Sport::Golf, Sport::Soccer], now())
            .await
            .unwrap();
        // Golf shares the canned source, so it posts before Soccer gets a turn
        assert!(data.should_post());
        assert_eq!(expect_post(data).sport, Sport::Golf);
    }

    #[tokio::test]
    async fn priority_list_aggregates_skip_reasons() {
        let (primary, _) = Canned::new(vec![]);
        let (fallback, _) = Canned::new(vec![]);
        let p = pipeline(primary, fallback);

        let data = p.first_postable(&[Sport::Golf, Sport::Soccer], now()).await.unwrap();
        let PostData::Skip { sport, reason } = data else {
            panic!("expected skip");
        };
        assert_eq!(sport, Sport::Soccer);
        assert_eq!(
            reason,
            "Golf: no Golf stories from canned or canned; Soccer: no Soccer stories from canned or canned"
        );

        assert!(p.first_postable(&[], now()).await.is_err());
    }
}

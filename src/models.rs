use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use url::Url;

/// Closed set of sports the bot knows how to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Soccer,
    Basketball,
    Tennis,
    Mma,
    Formula1,
    Boxing,
    Cricket,
    Rugby,
    Golf,
    Baseball,
    Cycling,
    Hockey,
    Esports,
}

impl Sport {
    #[cfg(test)]
    pub const ALL: [Sport; 13] = [
        Sport::Soccer,
        Sport::Basketball,
        Sport::Tennis,
        Sport::Mma,
        Sport::Formula1,
        Sport::Boxing,
        Sport::Cricket,
        Sport::Rugby,
        Sport::Golf,
        Sport::Baseball,
        Sport::Cycling,
        Sport::Hockey,
        Sport::Esports,
    ];

    /// Human label used in captions and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Sport::Soccer => "Soccer",
            Sport::Basketball => "Basketball",
            Sport::Tennis => "Tennis",
            Sport::Mma => "MMA",
            Sport::Formula1 => "Formula 1",
            Sport::Boxing => "Boxing",
            Sport::Cricket => "Cricket",
            Sport::Rugby => "Rugby",
            Sport::Golf => "Golf",
            Sport::Baseball => "Baseball",
            Sport::Cycling => "Cycling",
            Sport::Hockey => "Hockey",
            Sport::Esports => "Esports",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A news item as returned by one of the sources, before any checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    /// `None` when the source gave no timestamp or one we could not parse.
    pub published_at: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub source: String,
}

/// An image URL that answered a live probe with `image/*` content.
///
/// Only the image validator can build one, so holding a `ValidatedImage`
/// means the link was checked during this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage(Url);

impl ValidatedImage {
    pub(crate) fn new(url: Url) -> Self {
        ValidatedImage(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub sport: Sport,
    pub title: String,
    pub url: String,
    pub image: ValidatedImage,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub when_text: String,
    pub summary: Option<String>,
    pub caption: String,
    pub hashtags: Vec<String>,
}

impl Post {
    pub fn hashtag_line(&self) -> String {
        self.hashtags.join(" ")
    }
}

/// Outcome of one pipeline run for a sport.
#[derive(Debug, Clone)]
pub enum PostData {
    Post(Post),
    Skip { sport: Sport, reason: String },
}

impl PostData {
    pub fn should_post(&self) -> bool {
        matches!(self, PostData::Post(_))
    }

    pub(crate) fn skip(sport: Sport, reason: impl Into<String>) -> Self {
        PostData::Skip {
            sport,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_posts_should_post() {
        assert!(!PostData::skip(Sport::Golf, "no fresh Golf story").should_post());

        let post = Post {
            sport: Sport::Golf,
            title: "McIlroy leads".to_string(),
            url: "https://news.example/golf".to_string(),
            image: ValidatedImage::new(Url::parse("https://img.example/golf.jpg").unwrap()),
            published_at: Utc::now(),
            source: "Example".to_string(),
            when_text: "just now".to_string(),
            summary: None,
            caption: "McIlroy leads • Example (just now)".to_string(),
            hashtags: vec![],
        };
        assert!(PostData::Post(post).should_post());
    }
}

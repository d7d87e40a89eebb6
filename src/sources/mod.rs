pub mod feeds;
pub mod guardian;

use async_trait::async_trait;

use crate::models::Candidate;
use crate::sports::SportProfile;
use crate::window::RecencyWindow;

pub use feeds::FeedReader;
pub use guardian::GuardianSearch;

const SUMMARY_MAX_CHARS: usize = 300;

/// Somewhere news candidates come from.
///
/// Implementations never fail outward: a source that is down, misconfigured
/// or returns garbage simply has nothing to offer this cycle.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(&self, profile: &SportProfile, window: &RecencyWindow) -> Vec<Candidate>;

    fn name(&self) -> &'static str;
}

/// Cleaned, length-capped excerpt, or `None` if nothing readable is left.
fn summarize(raw: Option<&str>) -> Option<String> {
    let text = crate::utils::clean_html_tags(raw?);
    if text.is_empty() {
        None
    } else {
        Some(crate::utils::truncate_chars(&text, SUMMARY_MAX_CHARS))
    }
}

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::models::Candidate;

/// The span a story has to fall into to count as fresh.
///
/// Looks back `days` from now and one day forward, since outlets in other
/// zones publish previews dated "tomorrow" from our point of view.
#[derive(Debug, Clone)]
pub struct RecencyWindow {
    pub now: DateTime<FixedOffset>,
    pub from: DateTime<FixedOffset>,
    pub until: DateTime<FixedOffset>,
    pub days: i64,
}

impl RecencyWindow {
    pub fn new(now: DateTime<FixedOffset>, days: i64) -> Self {
        RecencyWindow {
            now,
            from: now - Duration::days(days),
            until: now + Duration::days(1),
            days,
        }
    }

    /// `YYYY-MM-DD` of the first day, in the configured zone.
    pub fn from_date(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM-DD` of tomorrow, in the configured zone.
    pub fn to_date(&self) -> String {
        self.until.format("%Y-%m-%d").to_string()
    }

    pub fn contains(&self, published: &DateTime<Utc>) -> bool {
        *published > self.from && *published < self.until
    }

    /// Keep candidates with a valid timestamp inside the window, in input order.
    pub fn retain_fresh(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|c| c.published_at.as_ref().is_some_and(|ts| self.contains(ts)))
            .collect()
    }
}

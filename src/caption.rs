use chrono::{DateTime, Duration, FixedOffset, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::Sport;
use crate::utils::{clean_html_tags, slugify_tag};

pub const MAX_HASHTAGS: usize = 8;
const MAX_TAG_LEN: usize = 24;
const MAX_SIDE_WORDS: usize = 3;
const NAME_PARTICLES: [&str; 9] = ["de", "del", "da", "di", "do", "la", "van", "von", "of"];

static VERSUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*?)\s+(?:vs\.?|v\.?)\s+(.*)$").unwrap());
static SIDE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s[-–—]\s|[:|,;!?]").unwrap());

/// "Title • Source (2h ago)", with the title cleaned of markup.
pub fn build_caption(sport: Sport, title: &str, source: &str, when_text: &str) -> String {
    let title = clean_html_tags(title);
    let mut caption = if title.is_empty() {
        format!("Latest {} update", sport.label())
    } else {
        title
    };

    let source = source.trim();
    if !source.is_empty() {
        caption.push_str(" • ");
        caption.push_str(source);
    }

    let when_text = when_text.trim();
    if !when_text.is_empty() {
        caption.push_str(&format!(" ({when_text})"));
    }

    caption
}

/// Base tags for the sport followed by one tag per side of an "X vs Y" headline.
pub fn build_hashtags(base_tags: &[String], title: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    let base = base_tags.iter().map(|t| t.trim().trim_start_matches('#').to_string());
    for body in base.chain(matchup_tags(&clean_html_tags(title))) {
        if tags.len() == MAX_HASHTAGS {
            break;
        }
        if body.is_empty() || !seen.insert(body.to_lowercase()) {
            continue;
        }
        tags.push(format!("#{body}"));
    }

    tags
}

fn matchup_tags(title: &str) -> Vec<String> {
    let Some(caps) = VERSUS.captures(title) else {
        return Vec::new();
    };

    let left = SIDE_BREAK.split(&caps[1]).last().unwrap_or_default();
    let right = SIDE_BREAK.split(&caps[2]).next().unwrap_or_default();

    // Walk outward from "vs" so headline words around the names are left out
    let mut left = name_run(left.split_whitespace().rev());
    left.reverse();
    let right = name_run(right.split_whitespace());

    [left.join(" "), right.join(" ")]
        .iter()
        .map(|side| slugify_tag(side, MAX_TAG_LEN))
        .filter(|slug| !slug.is_empty())
        .collect()
}

/// Leading words that look like part of a name: not lowercase, or a name
/// particle such as "de" or "van". Particles at the far end are dropped.
fn name_run<'a>(words: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut run: Vec<&str> = words
        .take_while(|w| !starts_lowercase(w) || NAME_PARTICLES.contains(&w.to_lowercase().as_str()))
        .take(MAX_SIDE_WORDS)
        .collect();
    while run.last().is_some_and(|w| starts_lowercase(w)) {
        run.pop();
    }
    run
}

fn starts_lowercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_lowercase)
}

/// Short relative label for how long ago a story went out.
pub fn human_when(published: DateTime<Utc>, now: DateTime<FixedOffset>) -> String {
    let age = now.with_timezone(&Utc) - published;

    if age < Duration::hours(1) {
        "just now".to_string()
    } else if age < Duration::hours(24) {
        format!("{}h ago", age.num_hours())
    } else if age.num_days() <= 2 {
        format!("{}d ago", age.num_days())
    } else {
        published.with_timezone(now.offset()).format("%b %-d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 18, 12, 0, 0)
            .unwrap()
    }

    fn ago(minutes: i64) -> DateTime<Utc> {
        now().with_timezone(&Utc) - Duration::minutes(minutes)
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn human_when_thresholds() {
        assert_eq!(human_when(ago(0), now()), "just now");
        assert_eq!(human_when(ago(59), now()), "just now");
        assert_eq!(human_when(ago(60), now()), "1h ago");
        assert_eq!(human_when(ago(23 * 60 + 59), now()), "23h ago");
        assert_eq!(human_when(ago(24 * 60 + 1), now()), "1d ago");
        assert_eq!(human_when(ago(49 * 60), now()), "2d ago");
        assert_eq!(human_when(ago(73 * 60), now()), "Oct 15");
    }

    #[test]
    fn human_when_future_is_just_now() {
        assert_eq!(human_when(ago(-90), now()), "just now");
    }

    #[test]
    fn caption_on_clean_title() {
        let caption = build_caption(Sport::Soccer, "Clean Title", "X", "2h ago");
        assert_eq!(caption, "Clean Title • X (2h ago)");
        assert_eq!(build_caption(Sport::Soccer, &caption, "", ""), caption);
    }

    #[test]
    fn caption_strips_markup_and_skips_missing_parts() {
        assert_eq!(
            build_caption(Sport::Golf, "<b>McIlroy</b> leads", "", ""),
            "McIlroy leads"
        );
        assert_eq!(
            build_caption(Sport::Formula1, "  ", "BBC Sport", ""),
            "Latest Formula 1 update • BBC Sport"
        );
        assert_eq!(
            build_caption(Sport::Mma, "", "", "just now"),
            "Latest MMA update (just now)"
        );
    }

    #[test]
    fn matchup_tags_follow_base_tags() {
        let out = build_hashtags(&tags(&["#Football", "#UEFA"]), "Team Alpha vs Team Beta");
        assert_eq!(out, tags(&["#Football", "#UEFA", "#TeamAlpha", "#TeamBeta"]));
    }

    #[test]
    fn duplicates_are_dropped_case_insensitively() {
        let out = build_hashtags(&tags(&["#Football", "#Arsenal"]), "arsenal v Chelsea");
        assert_eq!(out, tags(&["#Football", "#Arsenal", "#Chelsea"]));
    }

    #[test]
    fn matchup_sides_stop_at_punctuation() {
        let out = build_hashtags(
            &[],
            "Live: Real Madrid vs. Atlético de Madrid - LaLiga clash",
        );
        assert_eq!(out, tags(&["#RealMadrid", "#AtléticodeMadrid"]));

        let out = build_hashtags(&[], "Canelo v Crawford: who wins?");
        assert_eq!(out, tags(&["#Canelo", "#Crawford"]));

        let out = build_hashtags(&[], "Big night as Boston Red Sox vs New York Yankees Game 7 looms");
        assert_eq!(out, tags(&["#BostonRedSox", "#NewYorkYankees"]));
    }

    #[test]
    fn matchup_sides_keep_only_the_names() {
        let out = build_hashtags(&[], "Big night as Man City vs Liverpool");
        assert_eq!(out, tags(&["#ManCity", "#Liverpool"]));

        let out = build_hashtags(&[], "Team Alpha vs Team Beta plain");
        assert_eq!(out, tags(&["#TeamAlpha", "#TeamBeta"]));

        let out = build_hashtags(&[], "Red Sox vs Yankees in Game 7");
        assert_eq!(out, tags(&["#RedSox", "#Yankees"]));

        let out = build_hashtags(&[], "preview: Ajax v PSV live");
        assert_eq!(out, tags(&["#Ajax", "#PSV"]));
    }

    #[test]
    fn tags_are_capped() {
        let base = tags(&["#a", "#b", "#c", "#d", "#e", "#f", "#g"]);
        let out = build_hashtags(&base, "Lions vs Tigers");
        assert_eq!(out.len(), MAX_HASHTAGS);
        assert_eq!(out.last().map(String::as_str), Some("#Lions"));
    }

    #[test]
    fn no_matchup_keeps_base_only() {
        let out = build_hashtags(&tags(&["NBA", "#NBA"]), "Trade deadline winners and losers");
        assert_eq!(out, tags(&["#NBA"]));
    }
}

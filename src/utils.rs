use regex::Regex;
use std::sync::LazyLock;

// Tag-shaped only, so a bare "<" in a headline survives
static INCOMPLETE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z/!][^>]*$").unwrap());
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:p|div|br|hr|li|ul|ol|h[1-6]|blockquote|table|tr|td|th|section|article|figure|figcaption)\b[^>]*>").unwrap()
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z!][^>]*>").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|\d+);").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip HTML tags and decode the entities feeds and search APIs like to leave
/// in headlines and trail text.
///
/// Handles:
///
/// - Complete and self-closing tags (`<strong>`, `<br/>`, `<img ... />`); block
///   tags leave a space behind, inline ones nothing
/// - A dangling tag cut off at the end of a truncated excerpt
/// - Common named entities and numeric ones (`&#8217;`, `&#x2019;`)
/// - Whitespace runs left behind after the tags are gone
///
/// ```ignore
/// let clean = clean_html_tags("<p>Spurs&rsquo; late <b>winner</b></p>");
/// assert_eq!(clean, "Spurs' late winner");
/// ```
pub fn clean_html_tags(text: &str) -> String {
    let cleaned = INCOMPLETE_TAG.replace_all(text, "");
    let cleaned = BLOCK_TAG.replace_all(&cleaned, " ");
    let cleaned = HTML_TAG.replace_all(&cleaned, "");

    let cleaned = cleaned
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&rdquo;", "\"")
        .replace("&ldquo;", "\"")
        .replace("&mdash;", "—")
        .replace("&ndash;", "–")
        .replace("&hellip;", "…");

    let cleaned = NUMERIC_ENTITY.replace_all(&cleaned, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' => '\''.to_string(),
                '\u{201C}' | '\u{201D}' => '"'.to_string(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    });

    // &amp; last, so "&amp;lt;" stays literal
    let cleaned = cleaned.replace("&amp;", "&");

    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// Turn a team or fighter name into a hashtag body: alphanumerics only,
/// at most `max_len` characters.
pub fn slugify_tag(name: &str, max_len: usize) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .take(max_len)
        .collect()
}

/// Cut `text` to at most `max_chars` characters, ending with an ellipsis when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out = out.trim_end().to_string();
    out.push('…');
    out
}

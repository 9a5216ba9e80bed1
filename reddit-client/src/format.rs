//! Rendering of subreddit listings into chat text.
//!
//! Items are read field by field from raw JSON so one malformed post never
//! costs the rest of the batch.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use snoobot_core::{ErrorExt, FormattedPost, RedditApiError};
use tracing::debug;

const REDDIT_WEB_BASE: &str = "https://www.reddit.com";
const PREVIEW_MAX_CHARS: usize = 200;
const EXCERPT_MAX_CHARS: usize = 200;
const DIVIDER: &str = "\n\n---\n\n";

/// Formats a listing body as returned by `/r/{subreddit}/hot`.
///
/// A body that is not a listing still produces text: a short excerpt of what
/// Reddit sent.
pub fn format_listing_body(body: &str, subreddit: &str, now: DateTime<Utc>) -> String {
    match listing_items(body) {
        Some(items) => format_posts(&items, subreddit, now),
        None => {
            RedditApiError::InvalidResponse {
                details: format!("listing for r/{} was not in the expected shape", subreddit),
            }
            .log_warn();
            format!(
                "Received an unexpected response for r/{}: {}",
                subreddit,
                truncate_chars(body.trim(), EXCERPT_MAX_CHARS)
            )
        }
    }
}

/// Pulls the `data` object of every child out of a listing.
pub fn listing_items(body: &str) -> Option<Vec<Value>> {
    let root: Value = serde_json::from_str(body).ok()?;
    let children = root.get("data")?.get("children")?.as_array()?;
    Some(
        children
            .iter()
            .map(|child| child.get("data").cloned().unwrap_or(Value::Null))
            .collect(),
    )
}

pub fn format_posts(items: &[Value], subreddit: &str, now: DateTime<Utc>) -> String {
    if items.is_empty() {
        return format!("No posts found in r/{}.", subreddit);
    }

    let rendered: Vec<String> = items
        .iter()
        .filter_map(|item| {
            let post = extract_post(item);
            if post.is_none() {
                debug!("Dropping post without title, permalink or score");
            }
            post
        })
        .enumerate()
        .map(|(index, post)| render_post(index + 1, &post, now))
        .collect();

    if rendered.is_empty() {
        return format!(
            "Could not read any of the {} posts returned for r/{}.",
            items.len(),
            subreddit
        );
    }

    format!(
        "Top posts from r/{}:\n\n{}",
        subreddit,
        rendered.join(DIVIDER)
    )
}

/// Reads one item. Title, permalink and a numeric score are required.
pub fn extract_post(item: &Value) -> Option<FormattedPost> {
    let title = non_empty_str(item, "title")?;
    let permalink = non_empty_str(item, "permalink")?;
    let score = item.get("score").and_then(|score| {
        score
            .as_i64()
            .or_else(|| score.as_f64().map(|value| value as i64))
    })?;

    let created = item
        .get("created_utc")
        .and_then(Value::as_f64)
        .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single());

    Some(FormattedPost {
        title: title.to_string(),
        permalink: permalink.to_string(),
        score,
        num_comments: item.get("num_comments").and_then(Value::as_u64),
        author: non_empty_str(item, "author").map(str::to_string),
        created,
        preview: extract_preview(item, permalink),
        nsfw: item.get("over_18").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn extract_preview(item: &Value, permalink: &str) -> Option<String> {
    if let Some(selftext) = non_empty_str(item, "selftext") {
        let collapsed = selftext.split_whitespace().collect::<Vec<_>>().join(" ");
        return Some(truncate_chars(&collapsed, PREVIEW_MAX_CHARS));
    }

    let is_self = item.get("is_self").and_then(Value::as_bool).unwrap_or(false);
    if is_self {
        return None;
    }

    // Link posts point elsewhere; self posts link back to their own permalink.
    non_empty_str(item, "url")
        .filter(|url| !url.contains(permalink))
        .map(str::to_string)
}

fn render_post(position: usize, post: &FormattedPost, now: DateTime<Utc>) -> String {
    let mut lines = Vec::with_capacity(4);

    let nsfw = if post.nsfw { " [NSFW]" } else { "" };
    lines.push(format!("{}. {}{}", position, post.title, nsfw));

    let comments = post
        .num_comments
        .map(|count| count.to_string())
        .unwrap_or_else(|| "?".to_string());
    let author = post.author.as_deref().unwrap_or("[unknown]");
    lines.push(format!(
        "{} points | {} comments | u/{} | {}",
        post.score,
        comments,
        author,
        relative_age(post.created, now)
    ));

    if let Some(preview) = &post.preview {
        lines.push(preview.clone());
    }
    lines.push(absolute_permalink(&post.permalink));

    lines.join("\n")
}

pub fn relative_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "unknown time".to_string();
    };

    let seconds = (now - created).num_seconds().max(0);
    match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}

fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{}{}", REDDIT_WEB_BASE, permalink)
    }
}

fn non_empty_str<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn post(title: &str, score: Value) -> Value {
        json!({
            "title": title,
            "permalink": format!("/r/rust/comments/{}/", title.to_lowercase().replace(' ', "_")),
            "score": score,
            "num_comments": 12,
            "author": "ferris",
            "created_utc": 1_700_000_000.0 - 7200.0,
            "selftext": "",
            "is_self": true,
            "url": "https://www.reddit.com/r/rust/comments/x/",
            "over_18": false
        })
    }

    #[test]
    fn test_empty_listing_has_fixed_message() {
        let text = format_posts(&[], "kotlin", now());
        assert_eq!(text, "No posts found in r/kotlin.");
    }

    #[test]
    fn test_item_without_score_is_dropped() {
        let items = vec![
            post("First", json!(10)),
            post("Broken", Value::Null),
            post("Second", json!(3)),
        ];

        let text = format_posts(&items, "rust", now());

        assert!(text.starts_with("Top posts from r/rust:"));
        assert!(text.contains("1. First"));
        assert!(text.contains("2. Second"));
        assert!(!text.contains("Broken"));
        assert_eq!(text.matches("---").count(), 1);
    }

    #[test]
    fn test_order_is_preserved() {
        let items = vec![post("Low", json!(1)), post("High", json!(500))];
        let text = format_posts(&items, "rust", now());
        assert!(text.find("Low").unwrap() < text.find("High").unwrap());
    }

    #[test]
    fn test_all_invalid_yields_diagnostic() {
        let items = vec![json!({ "title": "no link" }), Value::Null];
        let text = format_posts(&items, "rust", now());
        assert!(!text.trim().is_empty());
        assert!(text.contains("Could not read any of the 2 posts"));
    }

    #[test]
    fn test_rendered_fields() {
        let text = format_posts(&[post("Hello", json!(42))], "rust", now());
        assert!(text.contains("42 points | 12 comments | u/ferris | 2h ago"));
        assert!(text.contains("https://www.reddit.com/r/rust/comments/hello/"));
    }

    #[test]
    fn test_selftext_preview_is_truncated() {
        let mut item = post("Long", json!(1));
        item["selftext"] = json!("word ".repeat(100));

        let formatted = extract_post(&item).unwrap();
        let preview = formatted.preview.unwrap();
        assert!(preview.ends_with("..."));
        assert!(preview.chars().count() <= PREVIEW_MAX_CHARS + 3);
    }

    #[test]
    fn test_link_post_uses_external_url() {
        let mut item = post("Link", json!(1));
        item["is_self"] = json!(false);
        item["url"] = json!("https://blog.rust-lang.org/");
        item["over_18"] = json!(true);

        let formatted = extract_post(&item).unwrap();
        assert_eq!(formatted.preview.as_deref(), Some("https://blog.rust-lang.org/"));

        let text = format_posts(&[item], "rust", now());
        assert!(text.contains("1. Link [NSFW]"));
    }

    #[test]
    fn test_missing_optional_fields_degrade() {
        let item = json!({
            "title": "Bare",
            "permalink": "/r/rust/comments/bare/",
            "score": 7.0
        });

        let formatted = extract_post(&item).unwrap();
        assert_eq!(formatted.score, 7);
        assert!(formatted.author.is_none());

        let text = format_posts(&[item], "rust", now());
        assert!(text.contains("7 points | ? comments | u/[unknown] | unknown time"));
    }

    #[test]
    fn test_relative_age_buckets() {
        let now = now();
        assert_eq!(relative_age(None, now), "unknown time");
        assert_eq!(relative_age(Some(now - Duration::seconds(30)), now), "just now");
        assert_eq!(relative_age(Some(now - Duration::minutes(5)), now), "5m ago");
        assert_eq!(relative_age(Some(now - Duration::hours(3)), now), "3h ago");
        assert_eq!(relative_age(Some(now - Duration::days(4)), now), "4d ago");
        // Clock skew never produces negative ages.
        assert_eq!(relative_age(Some(now + Duration::minutes(2)), now), "just now");
    }

    #[test]
    fn test_listing_body_parsing() {
        let body = json!({
            "kind": "Listing",
            "data": { "children": [ { "kind": "t3", "data": post("Only", json!(9)) } ] }
        })
        .to_string();

        let text = format_listing_body(&body, "rust", now());
        assert!(text.contains("1. Only"));
    }

    #[test]
    fn test_unexpected_body_is_excerpted() {
        let body = format!("<html>{}</html>", "x".repeat(500));
        let text = format_listing_body(&body, "rust", now());
        assert!(text.starts_with("Received an unexpected response for r/rust: <html>"));
        assert!(text.ends_with("..."));
    }
}

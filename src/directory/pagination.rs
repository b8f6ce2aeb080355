//! Pagination cursors and rate-limit signals from API response headers

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::OnceLock;
use std::time::Duration;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
const RETRY_AFTER: &str = "retry-after";

/// Extra wait past the advertised reset to absorb clock skew
const RESET_SLACK: Duration = Duration::from_secs(1);

fn link_pattern() -> &'static Regex {
    static LINK_PATTERN: OnceLock<Regex> = OnceLock::new();
    LINK_PATTERN.get_or_init(|| {
        Regex::new(r#"<([^>]+)>\s*;\s*rel="([^"]+)""#).expect("link header pattern is valid")
    })
}

/// Extract the `rel="next"` target from a `Link` header value
pub fn next_link_from_header(value: &str) -> Option<String> {
    link_pattern()
        .captures_iter(value)
        .find(|caps| caps[2].split_whitespace().any(|rel| rel == "next"))
        .map(|caps| caps[1].to_string())
}

/// Next page URL advertised by a response, if any
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get(reqwest::header::LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(next_link_from_header)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// How long to wait before refetching a rate-limited page
///
/// Returns `None` when the response is not a rate-limit signal. A primary
/// limit (`X-RateLimit-Remaining: 0`) waits until `X-RateLimit-Reset`; a
/// secondary limit waits for `Retry-After`.
pub fn rate_limit_delay(
    status: StatusCode,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    if header_str(headers, RATE_LIMIT_REMAINING) == Some("0") {
        if let Some(reset) = header_str(headers, RATE_LIMIT_RESET).and_then(|r| r.parse::<i64>().ok())
        {
            let remaining_secs = (reset - now.timestamp()).max(0) as u64;
            return Some(Duration::from_secs(remaining_secs) + RESET_SLACK);
        }
    }

    header_str(headers, RETRY_AFTER)
        .and_then(|r| r.parse::<u64>().ok())
        .map(Duration::from_secs)
}

//! Validation helpers shared by configuration and the pipeline stages

/// Clamp a configured concurrency ceiling to a usable worker count
///
/// Values of zero or below would leave a bounded queue without consumers,
/// so they are floored to a single worker.
pub fn effective_concurrency(configured: i64) -> usize {
    if configured <= 0 {
        1
    } else {
        usize::try_from(configured).unwrap_or(usize::MAX)
    }
}

/// Return the trimmed value when present and non-blank
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate that a required setting is present and non-blank
pub fn require_setting<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, String> {
    non_blank(value).ok_or_else(|| format!("{} is required and was not provided", name))
}

/// Validate that a value parses as an absolute http(s) URL
pub fn validate_http_url(value: &str) -> Result<url::Url, String> {
    let parsed =
        url::Url::parse(value).map_err(|e| format!("'{}' is not a valid URL: {}", value, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!(
            "'{}' uses unsupported scheme '{}' (expected http or https)",
            value, other
        )),
    }
}

use url::Url;

use crate::error::PipelineError;

const SCHEMES: &[&str] = &["http", "https"];

/// True if `raw` is an absolute http(s) URL with a host.
pub fn validate(raw: &str) -> bool {
    parse(raw).is_some()
}

/// Parse a user-supplied URL, rejecting anything `validate` would reject.
pub fn parse_url(raw: &str) -> Result<Url, PipelineError> {
    parse(raw).ok_or_else(|| PipelineError::invalid(format!("Invalid URL format: {}", raw.trim())))
}

fn parse(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    if !SCHEMES.contains(&url.scheme()) {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

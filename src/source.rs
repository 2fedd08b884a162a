use serde::Serialize;
use url::Url;

/// Which loader a URL is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Video,
    GenericPage,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Video => write!(f, "video"),
            SourceKind::GenericPage => write!(f, "web page"),
        }
    }
}

pub fn classify(url: &Url) -> SourceKind {
    match url.host_str() {
        Some(host) if is_youtube_host(host) => SourceKind::Video,
        _ => SourceKind::GenericPage,
    }
}

pub fn is_youtube_host(host: &str) -> bool {
    let h = host.trim_end_matches('.').to_ascii_lowercase();
    h == "youtube.com"
        || h == "youtu.be"
        || h == "youtube-nocookie.com"
        || h == "www.youtube-nocookie.com"
        || h.ends_with(".youtube.com")
}

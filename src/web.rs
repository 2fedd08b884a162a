use eyre::{Result, bail};
use log::{debug, warn};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::Document;

/// Elements whose contents are never page text
const SKIPPED: &[&str] = &["head", "script", "style", "noscript", "template", "svg", "iframe", "canvas"];

/// Elements that start a new line of text
const BLOCKS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article", "main",
    "header", "footer", "nav", "aside", "blockquote", "pre", "tr", "table", "dt", "dd", "figcaption", "hr",
];

/// Build the client used for generic pages.
///
/// With `insecure_tls` set, certificate errors are ignored; some sites with
/// broken chains only load this way.
pub fn build_client(fetch: &crate::config::FetchConfig) -> reqwest::Result<reqwest::Client> {
    if fetch.insecure_tls {
        warn!("TLS certificate verification is disabled for web page fetches");
    }
    reqwest::Client::builder()
        .danger_accept_invalid_certs(fetch.insecure_tls)
        .user_agent(fetch.user_agent.as_str())
        .connect_timeout(fetch.connect_timeout)
        .timeout(fetch.timeout)
        .build()
}

/// Fetch a page and reduce it to one text document.
///
/// At most `max_bytes` of the body are read; the rest is dropped.
pub async fn fetch_page(client: &reqwest::Client, url: &Url, max_bytes: usize) -> Result<Document> {
    debug!("Fetching page: {url}");
    let mut resp = client.get(url.as_str()).send().await?.error_for_status()?;

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    if !is_textual(&content_type) {
        bail!("unsupported content type: {content_type}");
    }

    let mut bytes = Vec::new();
    let mut truncated = false;
    while let Some(chunk) = resp.chunk().await? {
        let room = max_bytes - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    if truncated {
        warn!("Page body at {url} exceeds {max_bytes} bytes; truncated");
    }
    // A cut can land inside a UTF-8 sequence
    let body = String::from_utf8_lossy(&bytes);
    debug!("Fetched {} bytes ({content_type})", bytes.len());

    let (text, title) = if content_type == "text/plain" {
        (body.trim().to_string(), None)
    } else {
        (html_to_text(&body), page_title(&body))
    };

    if text.is_empty() {
        bail!("no extractable text at {url}");
    }

    let mut doc = Document::new(text).with_meta("source", url.as_str());
    if !content_type.is_empty() {
        doc = doc.with_meta("content_type", content_type);
    }
    if let Some(title) = title {
        doc = doc.with_meta("title", title);
    }
    Ok(doc)
}

fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type == "application/xhtml+xml"
        || content_type == "application/xml"
}

/// Visible text of an HTML document, one line per block, whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut raw = String::new();
    walk(doc.root_element(), &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn walk(el: ElementRef, out: &mut String) {
    let name = el.value().name();
    if SKIPPED.contains(&name) {
        return;
    }
    let block = BLOCKS.contains(&name);
    if block {
        out.push('\n');
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push('\n');
    }
}

pub fn page_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("title").ok()?;
    let title = doc.select(&sel).next()?.text().collect::<String>();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_blocks() {
        let html = r#"<html><head><title>T</title></head><body>
            <h1>Heading</h1>
            <p>First   paragraph with <b>bold</b> text.</p>
            <ul><li>one</li><li>two</li></ul>
        </body></html>"#;
        assert_eq!(html_to_text(html), "Heading\nFirst paragraph with bold text.\none\ntwo");
    }

    #[test]
    fn test_html_to_text_skips_scripts_and_styles() {
        let html = r#"<html><body>
            <script>var x = "hidden";</script>
            <style>body { color: red; }</style>
            <noscript>enable js</noscript>
            <p>Visible</p>
        </body></html>"#;
        assert_eq!(html_to_text(html), "Visible");
    }

    #[test]
    fn test_html_to_text_empty_body() {
        let html = "<html><head><title>Only a title</title></head><body>  </body></html>";
        assert_eq!(html_to_text(html), "");
    }

    #[test]
    fn test_page_title() {
        let html = "<html><head><title>  My\n Page </title></head><body></body></html>";
        assert_eq!(page_title(html).as_deref(), Some("My Page"));
        assert_eq!(page_title("<html><body>x</body></html>"), None);
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual("text/html"));
        assert!(is_textual("text/plain"));
        assert!(is_textual(""));
        assert!(!is_textual("application/pdf"));
        assert!(!is_textual("image/png"));
    }

    #[test]
    fn test_build_client_both_tls_modes() {
        let fetch = crate::config::FetchConfig::default();
        assert!(fetch.insecure_tls);
        assert!(build_client(&fetch).is_ok());

        let secure = crate::config::FetchConfig {
            insecure_tls: false,
            ..fetch
        };
        assert!(build_client(&secure).is_ok());
    }
}

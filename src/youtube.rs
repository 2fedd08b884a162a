use eyre::{Result, bail, eyre};
use log::debug;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::Document;

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// The parts of the InnerTube `player` response the loader reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlayerResponse {
    captions: Option<PlayerCaptions>,
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlayerCaptions {
    player_captions_tracklist_renderer: Option<Tracklist>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Tracklist {
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VideoDetails {
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
}

impl PlayerResponse {
    fn title(&self) -> String {
        self.video_details.as_ref().map(|d| d.title.clone()).unwrap_or_default()
    }

    fn into_tracks(self) -> Vec<CaptionTrack> {
        self.captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|t| t.caption_tracks)
            .unwrap_or_default()
    }
}

/// Caption text for one video
#[derive(Debug, Clone)]
pub struct Transcript {
    pub video_id: String,
    pub title: String,
    pub language: String,
    pub segments: Vec<String>,
}

impl Transcript {
    pub fn text(&self) -> String {
        self.segments.join(" ")
    }

    pub fn into_document(self, source: &str) -> Document {
        Document::new(self.text())
            .with_meta("source", source)
            .with_meta("video_id", self.video_id)
            .with_meta("title", self.title)
            .with_meta("language", self.language)
    }
}

/// Fetch a video's captions via the InnerTube API.
///
/// `base_url` is the YouTube origin; track URLs in the player response may
/// be absolute or relative to it.
pub async fn fetch_captions(client: &reqwest::Client, base_url: &str, video_id: &str, lang: &str) -> Result<Transcript> {
    let api_key = innertube_key(client, base_url, video_id).await?;
    let player = fetch_player(client, base_url, &api_key, video_id, lang).await?;

    let title = player.title();
    let tracks = player.into_tracks();
    let Some(track) = select_track(&tracks, lang) else {
        bail!("no captions available for video {video_id}");
    };
    debug!("Using caption track {} of {}", track.language_code, tracks.len());

    let track_url = track_url(base_url, &track.base_url)?;
    let xml = get_text(client, track_url.as_str()).await?;
    let segments = parse_caption_xml(&xml)?;
    if segments.is_empty() {
        bail!("caption track for video {video_id} is empty");
    }

    Ok(Transcript {
        video_id: video_id.to_string(),
        title,
        language: track.language_code.clone(),
        segments,
    })
}

async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let text = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}

/// The watch page embeds the key the player endpoint expects.
async fn innertube_key(client: &reqwest::Client, base_url: &str, video_id: &str) -> Result<String> {
    let watch_url = format!("{base_url}/watch?v={video_id}");
    debug!("Fetching watch page: {watch_url}");
    let html = get_text(client, &watch_url).await?;
    find_api_key(&html).ok_or_else(|| eyre!("watch page for {video_id} has no InnerTube API key"))
}

async fn fetch_player(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    video_id: &str,
    lang: &str,
) -> Result<PlayerResponse> {
    let body = serde_json::json!({
        "context": {
            "client": {
                "hl": lang,
                "gl": "US",
                "clientName": "WEB",
                "clientVersion": "2.20241126.01.00"
            }
        },
        "videoId": video_id
    });

    let player = client
        .post(format!("{base_url}/youtubei/v1/player"))
        .query(&[("key", api_key), ("prettyPrint", "false")])
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(player)
}

/// Absolute track URLs are used as-is; relative ones hang off the origin.
fn track_url(base_url: &str, track: &str) -> Result<Url> {
    let origin = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
    Ok(origin.join(track)?)
}

/// The requested language, then its base language (`en` for `en-US`), then the first track.
fn select_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    let base = lang.split('-').next().unwrap_or(lang);
    tracks
        .iter()
        .find(|t| t.language_code == lang)
        .or_else(|| tracks.iter().find(|t| t.language_code.split('-').next() == Some(base)))
        .or_else(|| tracks.first())
}

/// Both the `ytcfg` JSON form and the older `innertubeApiKey` assignment.
fn find_api_key(html: &str) -> Option<String> {
    let re = Regex::new(r#"(?:"INNERTUBE_API_KEY"|\binnertubeApiKey)\s*[=:]\s*"([^"]+)""#).ok()?;
    re.captures(html).map(|caps| caps[1].to_string())
}

fn parse_caption_xml(xml: &str) -> Result<Vec<String>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                in_text = true;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                in_text = false;
            }
            Ok(Event::Text(ref e)) if in_text => {
                let raw_text = e.unescape().unwrap_or_default().to_string();
                let text = html_escape::decode_html_entities(&raw_text).replace('\n', " ");
                let text = text.trim();
                if !text.is_empty() {
                    segments.push(text.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::core::engine::Strategy;
use crate::core::error::StrategyError;
use crate::core::metadata::{QualityConstraint, ResolutionResult};
use crate::extractors::http::{fetch_text, non_empty};
use crate::utils::format_size_label;

/// Whether a rendition carries video, audio or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenditionKind {
    Muxed,
    VideoOnly,
    AudioOnly,
}

/// One fetchable stream of a YouTube video.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    pub url: String,
    pub kind: RenditionKind,
    /// Ordering key, higher is better (bitrate, or height when unknown).
    pub rank: u64,
    pub quality_label: Option<String>,
    pub content_length: Option<u64>,
}

impl Rendition {
    pub fn label(&self) -> String {
        match (&self.quality_label, self.kind) {
            (Some(label), _) => label.clone(),
            (None, RenditionKind::AudioOnly) => format!("audio {}kbps", self.rank / 1000),
            (None, _) => "Unknown".to_string(),
        }
    }
}

/// Picks the rendition matching `quality`; unconstrained means highest.
pub fn pick_rendition(renditions: &[Rendition], quality: Option<QualityConstraint>) -> Option<&Rendition> {
    let of_kind = |kind: RenditionKind| renditions.iter().filter(move |r| r.kind == kind);

    match quality.unwrap_or(QualityConstraint::Highest) {
        QualityConstraint::Highest => of_kind(RenditionKind::Muxed).max_by_key(|r| r.rank),
        QualityConstraint::Lowest => of_kind(RenditionKind::Muxed).min_by_key(|r| r.rank),
        QualityConstraint::AudioOnly => of_kind(RenditionKind::AudioOnly).max_by_key(|r| r.rank),
    }
}

/// More than one thing a user could sensibly pick between.
pub fn has_alternatives(renditions: &[Rendition]) -> bool {
    renditions
        .iter()
        .filter(|r| r.kind != RenditionKind::VideoOnly)
        .count()
        > 1
}

pub fn kind_from_mime(mime: &str, muxed: bool) -> RenditionKind {
    if mime.starts_with("audio/") {
        RenditionKind::AudioOnly
    } else if muxed {
        RenditionKind::Muxed
    } else {
        RenditionKind::VideoOnly
    }
}

/// Video id from the watch, short-link, shorts, embed and live URL forms.
pub fn video_id(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();

    if host == "youtu.be" || host.ends_with(".youtu.be") {
        return url
            .path_segments()?
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
    }

    if host.contains("youtube.com") {
        if let Some((_, v)) = url.query_pairs().find(|(key, _)| key == "v") {
            return Some(v.to_string());
        }
        let mut segments = url.path_segments()?;
        if let (Some("shorts" | "embed" | "live" | "v"), Some(id)) = (segments.next(), segments.next()) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }

    None
}

pub struct YouTubeWatchPage {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl YouTubeWatchPage {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn fetch_page(&self, video_id: &str) -> Result<String, StrategyError> {
        let request = self
            .client
            .get(format!("{}/watch?v={}", self.base, video_id))
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Accept-Encoding", "identity")
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none");

        let html = fetch_text(request).await?;
        if html.is_empty() {
            return Err(StrategyError::Schema("empty watch page".to_string()));
        }
        Ok(html)
    }
}

/// The `ytInitialPlayerResponse` object embedded in a watch page.
pub fn extract_player_response(html: &str) -> Result<Value, StrategyError> {
    let patterns = [
        r#"ytInitialPlayerResponse\s*=\s*(\{.+?\});"#,
        r#"ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;"#,
        r#"ytInitialPlayerResponse":\s*(\{.+?\})"#,
        r#"var\s+ytInitialPlayerResponse\s*=\s*(\{.+?\});"#,
    ];

    for pattern in &patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        let Some(json) = re.captures(html).and_then(|c| c.get(1)) else {
            continue;
        };
        if let Ok(parsed) = serde_json::from_str::<Value>(json.as_str()) {
            return Ok(parsed);
        }
    }

    Err(StrategyError::Schema("no ytInitialPlayerResponse in page".to_string()))
}

/// Renditions that carry a plain `url`. Ciphered formats are skipped.
pub fn direct_renditions(player_response: &Value) -> Vec<Rendition> {
    let Some(streaming_data) = player_response.get("streamingData") else {
        return Vec::new();
    };

    let mut renditions = Vec::new();
    for (key, muxed) in [("formats", true), ("adaptiveFormats", false)] {
        let Some(formats) = streaming_data.get(key).and_then(|v| v.as_array()) else {
            continue;
        };
        for format in formats {
            let Some(url) = format.get("url").and_then(|v| v.as_str()) else {
                tracing::debug!(
                    "Format {} needs signature decryption, skipping",
                    format.get("itag").unwrap_or(&serde_json::Value::Null)
                );
                continue;
            };
            let mime = format
                .get("mimeType")
                .and_then(|v| v.as_str())
                .unwrap_or("video/mp4");

            renditions.push(Rendition {
                url: url.to_string(),
                kind: kind_from_mime(mime, muxed),
                rank: format.get("bitrate").and_then(|v| v.as_u64()).unwrap_or(0),
                quality_label: non_empty(format.get("qualityLabel").and_then(|v| v.as_str())),
                content_length: format
                    .get("contentLength")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<u64>().ok()),
            });
        }
    }

    renditions
}

#[async_trait]
impl Strategy for YouTubeWatchPage {
    fn name(&self) -> &'static str {
        "youtube-watch-page"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let id = video_id(url).ok_or_else(|| StrategyError::InvalidInput(url.to_string()))?;
        let html = self.fetch_page(&id).await?;
        let player_response = extract_player_response(&html)?;

        if let Some(status) = player_response
            .pointer("/playabilityStatus/status")
            .and_then(|v| v.as_str())
            .filter(|s| *s != "OK")
        {
            let reason = player_response
                .pointer("/playabilityStatus/reason")
                .and_then(|v| v.as_str())
                .unwrap_or("no reason given");
            return Err(StrategyError::Schema(format!("video not playable ({}): {}", status, reason)));
        }

        let details = player_response
            .get("videoDetails")
            .ok_or_else(|| StrategyError::Schema("no videoDetails".to_string()))?;

        let renditions = direct_renditions(&player_response);
        tracing::debug!("Found {} direct renditions for {}", renditions.len(), id);
        let chosen = pick_rendition(&renditions, quality).ok_or(StrategyError::NoMedia)?;

        let mut result = ResolutionResult::new(self.name(), chosen.url.clone());
        if let Some(title) = non_empty(details.get("title").and_then(|v| v.as_str())) {
            result.title = title;
        }
        if let Some(author) = non_empty(details.get("author").and_then(|v| v.as_str())) {
            result.author_name = author;
        }
        result.duration_seconds = details
            .get("lengthSeconds")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        result.thumbnail_url = details
            .pointer("/thumbnail/thumbnails")
            .and_then(|v| v.as_array())
            .and_then(|thumbs| thumbs.last())
            .and_then(|t| t.get("url"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)));
        result.quality_label = chosen.label();
        result.approximate_size_label = format_size_label(chosen.content_length);
        result.has_alternatives = has_alternatives(&renditions);

        Ok(result)
    }
}

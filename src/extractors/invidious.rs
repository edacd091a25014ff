use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::core::engine::Strategy;
use crate::core::error::StrategyError;
use crate::core::metadata::{QualityConstraint, ResolutionResult};
use crate::extractors::http::{absolutize, fetch_json, non_empty};
use crate::extractors::youtube::{has_alternatives, kind_from_mime, pick_rendition, video_id, Rendition};
use crate::utils::format_size_label;

/// `GET {base}/api/v1/videos/{id}` on an Invidious instance.
pub struct InvidiousApi {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    title: Option<String>,
    author: Option<String>,
    #[serde(default)]
    length_seconds: u64,
    #[serde(default)]
    video_thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    format_streams: Vec<Stream>,
    #[serde(default)]
    adaptive_formats: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stream {
    url: String,
    #[serde(rename = "type", default)]
    mime: String,
    /// Numeric strings on this API.
    bitrate: Option<String>,
    clen: Option<String>,
    quality_label: Option<String>,
}

impl Stream {
    fn into_rendition(self, muxed: bool, base: &str) -> Rendition {
        let height_rank = self
            .quality_label
            .as_deref()
            .and_then(|l| {
                l.chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse::<u64>()
                    .ok()
            })
            .map(|h| h * 1000);

        Rendition {
            url: absolutize(base, &self.url),
            kind: kind_from_mime(&self.mime, muxed),
            rank: self
                .bitrate
                .as_deref()
                .and_then(|b| b.parse().ok())
                .or(height_rank)
                .unwrap_or(0),
            quality_label: non_empty(self.quality_label.as_deref()),
            content_length: self.clen.as_deref().and_then(|c| c.parse().ok()),
        }
    }
}

impl InvidiousApi {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for InvidiousApi {
    fn name(&self) -> &'static str {
        "invidious"
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
        let video: VideoResponse = fetch_json(
            self.client
                .get(format!("{}/api/v1/videos/{}", self.base, id))
                .query(&[("local", "false")]),
        )
        .await?;

        let renditions: Vec<Rendition> = video
            .format_streams
            .into_iter()
            .map(|s| s.into_rendition(true, &self.base))
            .chain(
                video
                    .adaptive_formats
                    .into_iter()
                    .map(|s| s.into_rendition(false, &self.base)),
            )
            .collect();
        let chosen = pick_rendition(&renditions, quality).ok_or(StrategyError::NoMedia)?;

        let mut result = ResolutionResult::new(self.name(), chosen.url.clone());
        if let Some(title) = non_empty(video.title.as_deref()) {
            result.title = title;
        }
        if let Some(author) = non_empty(video.author.as_deref()) {
            result.author_name = author;
        }
        result.duration_seconds = video.length_seconds;
        result.thumbnail_url = video
            .video_thumbnails
            .first()
            .map(|t| absolutize(&self.base, &t.url));
        result.quality_label = chosen.label();
        result.approximate_size_label = format_size_label(chosen.content_length);
        result.has_alternatives = has_alternatives(&renditions);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/videos/dQw4w9WgXcQ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_lowest_picks_smallest_muxed_stream() {
        let server = server_with(serde_json::json!({
            "title": "Clip",
            "author": "Channel",
            "lengthSeconds": 90,
            "videoThumbnails": [{"url": "/vi/dQw4w9WgXcQ/maxres.jpg"}],
            "formatStreams": [
                {"url": "https://r2.googlevideo.com/videoplayback?itag=22", "type": "video/mp4", "qualityLabel": "720p"},
                {"url": "https://r2.googlevideo.com/videoplayback?itag=18", "type": "video/mp4", "qualityLabel": "360p"}
            ],
            "adaptiveFormats": [
                {"url": "https://r2.googlevideo.com/videoplayback?itag=140", "type": "audio/mp4; codecs=\"mp4a.40.2\"", "bitrate": "130000", "clen": "3145728"}
            ]
        }))
        .await;

        let strategy = InvidiousApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let lowest = strategy
            .attempt("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Some(QualityConstraint::Lowest))
            .await
            .unwrap();
        assert!(lowest.direct_media_url.ends_with("itag=18"));
        assert_eq!(lowest.quality_label, "360p");
        assert_eq!(lowest.duration_seconds, 90);
        assert_eq!(
            lowest.thumbnail_url.as_deref(),
            Some(format!("{}/vi/dQw4w9WgXcQ/maxres.jpg", server.uri()).as_str())
        );

        let audio = strategy
            .attempt("https://youtu.be/dQw4w9WgXcQ", Some(QualityConstraint::AudioOnly))
            .await
            .unwrap();
        assert!(audio.direct_media_url.ends_with("itag=140"));
        assert_eq!(audio.approximate_size_label, "3.00MB");
    }

    #[tokio::test]
    async fn test_no_streams_is_no_media() {
        let server = server_with(serde_json::json!({"title": "Live soon"})).await;
        let strategy = InvidiousApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let err = strategy.attempt("https://youtu.be/dQw4w9WgXcQ", None).await.unwrap_err();
        assert!(matches!(err, StrategyError::NoMedia));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let strategy = InvidiousApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let err = strategy.attempt("https://youtu.be/dQw4w9WgXcQ", None).await.unwrap_err();
        assert!(matches!(err, StrategyError::Status { status: 503 }));
    }
}

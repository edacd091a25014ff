use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::core::engine::Strategy;
use crate::core::error::StrategyError;
use crate::core::metadata::{QualityConstraint, ResolutionResult};
use crate::extractors::http::{absolutize, fetch_json, non_empty};
use crate::utils::format_size_label;

const DEFAULT_TITLE: &str = "TikTok Video";
const DEFAULT_AUTHOR: &str = "TikTok User";

fn tiktok_result(strategy: &str, locator: String) -> ResolutionResult {
    let mut result = ResolutionResult::new(strategy, locator);
    result.title = DEFAULT_TITLE.to_string();
    result.author_name = DEFAULT_AUTHOR.to_string();
    result.quality_label = "HD".to_string();
    result
}

/// `GET {base}/api/?url=…` on tikwm.
pub struct TikwmApi {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TikwmResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<TikwmData>,
}

#[derive(Debug, Deserialize)]
struct TikwmData {
    play: Option<String>,
    hdplay: Option<String>,
    wmplay: Option<String>,
    music: Option<String>,
    title: Option<String>,
    author: Option<TikwmAuthor>,
    duration: Option<u64>,
    cover: Option<String>,
    size: Option<u64>,
    hd_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TikwmAuthor {
    nickname: Option<String>,
}

impl TikwmData {
    /// Locator, quality label and byte size for the requested rendition,
    /// trying the alternatives tikwm exposes in order.
    fn pick(&self, quality: Option<QualityConstraint>) -> Option<(&str, &'static str, Option<u64>)> {
        let hd = (self.hdplay.as_deref(), "HD", self.hd_size);
        let sd = (self.play.as_deref(), "SD", self.size);
        let watermarked = (self.wmplay.as_deref(), "SD (watermark)", None);
        let music = (self.music.as_deref(), "Audio", None);

        let order = match quality {
            None => vec![sd, hd, watermarked],
            Some(QualityConstraint::Highest) => vec![hd, sd, watermarked],
            Some(QualityConstraint::Lowest) => vec![sd, watermarked, hd],
            Some(QualityConstraint::AudioOnly) => vec![music, sd, hd],
        };

        order.into_iter().find_map(|(url, label, size)| {
            url.filter(|u| !u.trim().is_empty()).map(|u| (u, label, size))
        })
    }
}

impl TikwmApi {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for TikwmApi {
    fn name(&self) -> &'static str {
        "tikwm"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let endpoint = format!("{}/api/?url={}&hd=1", self.base, urlencoding::encode(url));
        let response: TikwmResponse = fetch_json(self.client.get(endpoint)).await?;

        if response.code != 0 {
            return Err(StrategyError::Schema(format!("tikwm code {}: {}", response.code, response.msg)));
        }
        let data = response.data.ok_or(StrategyError::NoMedia)?;
        let (locator, label, size) = data.pick(quality).ok_or(StrategyError::NoMedia)?;
        debug!("tikwm picked {} rendition", label);

        let mut result = tiktok_result(self.name(), absolutize(&self.base, locator));
        if let Some(title) = non_empty(data.title.as_deref()) {
            result.title = title;
        }
        if let Some(author) = non_empty(data.author.as_ref().and_then(|a| a.nickname.as_deref())) {
            result.author_name = author;
        }
        result.duration_seconds = data.duration.unwrap_or(0);
        result.thumbnail_url = non_empty(data.cover.as_deref()).map(|c| absolutize(&self.base, &c));
        result.quality_label = label.to_string();
        result.approximate_size_label = format_size_label(size);

        Ok(result)
    }
}

/// TikTok's own oEmbed for metadata plus a companion service for the file.
pub struct TikTokOembedCompanion {
    client: reqwest::Client,
    oembed_base: String,
    companion_base: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Oembed {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompanionResponse {
    video_url: Option<String>,
}

impl TikTokOembedCompanion {
    pub fn new(client: reqwest::Client, oembed_base: &str, companion_base: &str, timeout: Duration) -> Self {
        Self {
            client,
            oembed_base: oembed_base.trim_end_matches('/').to_string(),
            companion_base: companion_base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for TikTokOembedCompanion {
    fn name(&self) -> &'static str {
        "tiktok-oembed+tikdown"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        _quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let encoded = urlencoding::encode(url);

        // Metadata is optional; the companion alone decides success.
        let oembed_url = format!("{}/oembed?url={}", self.oembed_base, encoded);
        let oembed = match fetch_json::<Oembed>(self.client.get(oembed_url)).await {
            Ok(oembed) => Some(oembed),
            Err(e) => {
                debug!("oEmbed lookup failed: {}", e);
                None
            }
        };

        let companion: CompanionResponse = fetch_json(
            self.client
                .get(format!("{}/get?url={}", self.companion_base, encoded)),
        )
        .await?;
        let locator = non_empty(companion.video_url.as_deref()).ok_or(StrategyError::NoMedia)?;

        let mut result = tiktok_result(self.name(), absolutize(&self.companion_base, &locator));
        if let Some(oembed) = oembed {
            if let Some(title) = non_empty(oembed.title.as_deref()) {
                result.title = title;
            }
            if let Some(author) = non_empty(oembed.author_name.as_deref()) {
                result.author_name = author;
            }
            result.thumbnail_url = non_empty(oembed.thumbnail_url.as_deref());
        }

        Ok(result)
    }
}

/// `POST {base}/vid/index` with `{"url": …}` on a downloader mirror.
pub struct TikTokMirror {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl TikTokMirror {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

/// Mirrors answer with either a string or a list of strings per field.
fn first_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Array(items) => items.iter().find_map(|v| non_empty(v.as_str())),
        _ => None,
    }
}

#[async_trait]
impl Strategy for TikTokMirror {
    fn name(&self) -> &'static str {
        "tiktok-mirror"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let body: Value = fetch_json(
            self.client
                .post(format!("{}/vid/index", self.base))
                .json(&serde_json::json!({ "url": url })),
        )
        .await?;

        let locator = match quality {
            Some(QualityConstraint::AudioOnly) => {
                first_string(body.get("music")).or_else(|| first_string(body.get("video")))
            }
            _ => first_string(body.get("video")),
        }
        .ok_or(StrategyError::NoMedia)?;

        let mut result = tiktok_result(self.name(), locator);
        if let Some(author) = first_string(body.get("author")) {
            result.author_name = author;
        }
        result.thumbnail_url = first_string(body.get("cover"));

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VIDEO: &str = "https://www.tiktok.com/@user/video/123";

    fn tikwm_body() -> Value {
        serde_json::json!({
            "code": 0,
            "msg": "success",
            "data": {
                "title": "dance",
                "author": {"nickname": "dancer"},
                "duration": 15,
                "cover": "/cover/123.webp",
                "play": "https://v16m.tiktokcdn.com/play.mp4",
                "hdplay": "https://v16m.tiktokcdn.com/hd.mp4",
                "wmplay": "https://v16m.tiktokcdn.com/wm.mp4",
                "music": "https://sf16.tiktokcdn.com/music.mp3",
                "size": 2097152,
                "hd_size": 4194304
            }
        })
    }

    #[tokio::test]
    async fn test_tikwm_prefers_play_then_honours_constraints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .and(query_param("url", VIDEO))
            .respond_with(ResponseTemplate::new(200).set_body_json(tikwm_body()))
            .mount(&server)
            .await;
        let strategy = TikwmApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let default = strategy.attempt(VIDEO, None).await.unwrap();
        assert_eq!(default.direct_media_url, "https://v16m.tiktokcdn.com/play.mp4");
        assert_eq!(default.title, "dance");
        assert_eq!(default.author_name, "dancer");
        assert_eq!(default.approximate_size_label, "2.00MB");
        assert_eq!(default.thumbnail_url, Some(format!("{}/cover/123.webp", server.uri())));

        let hd = strategy.attempt(VIDEO, Some(QualityConstraint::Highest)).await.unwrap();
        assert_eq!(hd.direct_media_url, "https://v16m.tiktokcdn.com/hd.mp4");
        assert_eq!(hd.quality_label, "HD");

        let audio = strategy.attempt(VIDEO, Some(QualityConstraint::AudioOnly)).await.unwrap();
        assert_eq!(audio.direct_media_url, "https://sf16.tiktokcdn.com/music.mp3");
    }

    #[tokio::test]
    async fn test_tikwm_error_code_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": -1, "msg": "Url parsing is failed!"
            })))
            .mount(&server)
            .await;
        let strategy = TikwmApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let err = strategy.attempt(VIDEO, None).await.unwrap_err();
        assert!(err.to_string().contains("Url parsing is failed"));
    }

    #[tokio::test]
    async fn test_companion_works_without_oembed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "video_url": "https://cdn.tikdown.example/v/123.mp4"
            })))
            .mount(&server)
            .await;
        let strategy = TikTokOembedCompanion::new(
            reqwest::Client::new(),
            &server.uri(),
            &server.uri(),
            Duration::from_secs(5),
        );

        let result = strategy.attempt(VIDEO, None).await.unwrap();
        assert_eq!(result.direct_media_url, "https://cdn.tikdown.example/v/123.mp4");
        assert_eq!(result.title, DEFAULT_TITLE);
    }

    #[tokio::test]
    async fn test_companion_merges_oembed_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "cat video", "author_name": "catlover", "thumbnail_url": "https://p16.tiktokcdn.com/t.jpg"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "video_url": "https://cdn.tikdown.example/v/123.mp4"
            })))
            .mount(&server)
            .await;
        let strategy = TikTokOembedCompanion::new(
            reqwest::Client::new(),
            &server.uri(),
            &server.uri(),
            Duration::from_secs(5),
        );

        let result = strategy.attempt(VIDEO, None).await.unwrap();
        assert_eq!(result.title, "cat video");
        assert_eq!(result.author_name, "catlover");
    }

    #[tokio::test]
    async fn test_mirror_accepts_string_or_list_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vid/index"))
            .and(body_json(serde_json::json!({ "url": VIDEO })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "video": ["https://v19.tiktokcdn.com/nowm.mp4"],
                "music": "https://sf16.tiktokcdn.com/m.mp3",
                "author": ["someone"]
            })))
            .mount(&server)
            .await;
        let strategy = TikTokMirror::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let video = strategy.attempt(VIDEO, None).await.unwrap();
        assert_eq!(video.direct_media_url, "https://v19.tiktokcdn.com/nowm.mp4");
        assert_eq!(video.author_name, "someone");

        let audio = strategy.attempt(VIDEO, Some(QualityConstraint::AudioOnly)).await.unwrap();
        assert_eq!(audio.direct_media_url, "https://sf16.tiktokcdn.com/m.mp3");
    }

    #[tokio::test]
    async fn test_mirror_without_video_is_no_media() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "limit"})))
            .mount(&server)
            .await;
        let strategy = TikTokMirror::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        assert!(matches!(strategy.attempt(VIDEO, None).await, Err(StrategyError::NoMedia)));
    }
}

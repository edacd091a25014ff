use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

use crate::core::engine::Strategy;
use crate::core::error::StrategyError;
use crate::core::metadata::{QualityConstraint, ResolutionResult};
use crate::extractors::http::{fetch_json, non_empty};

pub fn tweet_id(url: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"/status(?:es)?/(\d+)").expect("tweet id pattern is valid"));
    pattern.captures(url).map(|c| c[1].to_string())
}

/// Shorten tweet text into something usable as a title.
fn title_from_text(text: Option<&str>) -> Option<String> {
    let text = non_empty(text)?;
    let first_line = text.lines().next().unwrap_or_default();
    let mut title: String = first_line.chars().take(80).collect();
    if first_line.chars().count() > 80 {
        title.push('…');
    }
    Some(title)
}

/// `GET {base}/status/{id}` on an FxTwitter API instance.
pub struct FxTwitterApi {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct FxResponse {
    tweet: Option<FxTweet>,
}

#[derive(Debug, Deserialize)]
struct FxTweet {
    text: Option<String>,
    author: Option<FxAuthor>,
    media: Option<FxMedia>,
}

#[derive(Debug, Deserialize)]
struct FxAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FxMedia {
    #[serde(default)]
    videos: Vec<FxVideo>,
}

#[derive(Debug, Deserialize)]
struct FxVideo {
    url: String,
    thumbnail_url: Option<String>,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    variants: Vec<FxVariant>,
}

#[derive(Debug, Deserialize)]
struct FxVariant {
    url: String,
    #[serde(default)]
    bitrate: u64,
    #[serde(default)]
    content_type: String,
}

impl FxVideo {
    fn mp4_variants(&self) -> Vec<&FxVariant> {
        self.variants
            .iter()
            .filter(|v| v.content_type == "video/mp4")
            .collect()
    }

    /// Locator and label for `quality`. Tweets carry no audio-only rendition,
    /// so that constraint gets the default video.
    fn pick(&self, quality: Option<QualityConstraint>) -> (String, String) {
        let variants = self.mp4_variants();
        let chosen = match quality {
            Some(QualityConstraint::Lowest) => variants.iter().min_by_key(|v| v.bitrate),
            Some(QualityConstraint::Highest) => variants.iter().max_by_key(|v| v.bitrate),
            _ => None,
        };
        match chosen {
            Some(v) => (v.url.clone(), format!("{}kbps", v.bitrate / 1000)),
            None => (self.url.clone(), "Best".to_string()),
        }
    }
}

impl FxTwitterApi {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for FxTwitterApi {
    fn name(&self) -> &'static str {
        "fxtwitter"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let id = tweet_id(url).ok_or_else(|| StrategyError::InvalidInput(url.to_string()))?;
        let response: FxResponse =
            fetch_json(self.client.get(format!("{}/status/{}", self.base, id))).await?;

        let tweet = response
            .tweet
            .ok_or_else(|| StrategyError::Schema("missing tweet".to_string()))?;
        let video = tweet
            .media
            .as_ref()
            .and_then(|m| m.videos.first())
            .ok_or(StrategyError::NoMedia)?;

        let (locator, label) = video.pick(quality);
        let mut result = ResolutionResult::new(self.name(), locator);
        result.title = title_from_text(tweet.text.as_deref()).unwrap_or_else(|| "Twitter Video".to_string());
        if let Some(name) = tweet.author.as_ref().and_then(|a| non_empty(a.name.as_deref())) {
            result.author_name = name;
        }
        result.duration_seconds = video.duration.round() as u64;
        result.thumbnail_url = video.thumbnail_url.clone();
        result.quality_label = label;

        Ok(result)
    }
}

/// `GET {base}/Twitter/status/{id}` on a vxTwitter API instance.
pub struct VxTwitterApi {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct VxResponse {
    text: Option<String>,
    user_name: Option<String>,
    #[serde(rename = "mediaURLs", default)]
    media_urls: Vec<String>,
    #[serde(default)]
    media_extended: Vec<VxMedia>,
}

#[derive(Debug, Deserialize)]
struct VxMedia {
    url: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    duration_millis: u64,
    thumbnail_url: Option<String>,
}

impl VxTwitterApi {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for VxTwitterApi {
    fn name(&self) -> &'static str {
        "vxtwitter"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        _quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let id = tweet_id(url).ok_or_else(|| StrategyError::InvalidInput(url.to_string()))?;
        let response: VxResponse =
            fetch_json(self.client.get(format!("{}/Twitter/status/{}", self.base, id))).await?;

        let video = response
            .media_extended
            .iter()
            .find(|m| m.kind == "video" || m.kind == "gif");

        let mut result = match video {
            Some(media) => {
                let mut result = ResolutionResult::new(self.name(), media.url.clone());
                result.duration_seconds = media.duration_millis / 1000;
                result.thumbnail_url = media.thumbnail_url.clone();
                result
            }
            None => {
                let locator = response
                    .media_urls
                    .iter()
                    .find(|u| u.contains(".mp4"))
                    .ok_or(StrategyError::NoMedia)?;
                ResolutionResult::new(self.name(), locator.clone())
            }
        };
        result.title = title_from_text(response.text.as_deref()).unwrap_or_else(|| "Twitter Video".to_string());
        if let Some(name) = non_empty(response.user_name.as_deref()) {
            result.author_name = name;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_tweet_id() {
        assert_eq!(tweet_id("https://x.com/someone/status/1790000000000000001?s=20").as_deref(), Some("1790000000000000001"));
        assert_eq!(tweet_id("https://twitter.com/i/web/status/42").as_deref(), Some("42"));
        assert_eq!(tweet_id("https://x.com/someone"), None);
    }

    #[test]
    fn test_long_text_is_truncated() {
        let text = "a".repeat(100);
        let title = title_from_text(Some(&text)).unwrap();
        assert_eq!(title.chars().count(), 81);
        assert!(title.ends_with('…'));
    }

    #[tokio::test]
    async fn test_fxtwitter_lowest_variant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "tweet": {
                    "text": "Look at this\nsecond line",
                    "author": {"name": "Poster"},
                    "media": {"videos": [{
                        "url": "https://video.twimg.com/ext_tw_video/42/pu/vid/1280x720/hi.mp4",
                        "thumbnail_url": "https://pbs.twimg.com/thumb.jpg",
                        "duration": 12.6,
                        "variants": [
                            {"url": "https://video.twimg.com/42/pl/list.m3u8", "content_type": "application/x-mpegURL"},
                            {"url": "https://video.twimg.com/42/vid/480x270/lo.mp4", "bitrate": 288000, "content_type": "video/mp4"},
                            {"url": "https://video.twimg.com/42/vid/1280x720/hi.mp4", "bitrate": 2176000, "content_type": "video/mp4"}
                        ]
                    }]}
                }
            })))
            .mount(&server)
            .await;
        let strategy = FxTwitterApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let result = strategy
            .attempt("https://x.com/poster/status/42", Some(QualityConstraint::Lowest))
            .await
            .unwrap();
        assert_eq!(result.direct_media_url, "https://video.twimg.com/42/vid/480x270/lo.mp4");
        assert_eq!(result.quality_label, "288kbps");
        assert_eq!(result.title, "Look at this");
        assert_eq!(result.author_name, "Poster");
        assert_eq!(result.duration_seconds, 13);
        assert!(!result.has_alternatives);
    }

    #[tokio::test]
    async fn test_fxtwitter_text_only_tweet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "tweet": {"text": "no video here"}
            })))
            .mount(&server)
            .await;
        let strategy = FxTwitterApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let err = strategy.attempt("https://x.com/p/status/7", None).await.unwrap_err();
        assert!(matches!(err, StrategyError::NoMedia));
    }

    #[tokio::test]
    async fn test_vxtwitter_media_extended() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Twitter/status/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "clip",
                "user_name": "Poster",
                "mediaURLs": ["https://video.twimg.com/42/vid/720x1280/a.mp4?tag=12"],
                "media_extended": [{
                    "url": "https://video.twimg.com/42/vid/720x1280/a.mp4?tag=12",
                    "type": "video",
                    "duration_millis": 9500,
                    "thumbnail_url": "https://pbs.twimg.com/t.jpg"
                }]
            })))
            .mount(&server)
            .await;
        let strategy = VxTwitterApi::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let result = strategy.attempt("https://twitter.com/p/status/42", None).await.unwrap();
        assert_eq!(result.direct_media_url, "https://video.twimg.com/42/vid/720x1280/a.mp4?tag=12");
        assert_eq!(result.duration_seconds, 9);
        assert_eq!(result.author_name, "Poster");
        assert_eq!(result.strategy_name, "vxtwitter");
    }
}

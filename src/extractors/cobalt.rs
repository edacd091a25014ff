use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::engine::Strategy;
use crate::core::error::StrategyError;
use crate::core::metadata::{QualityConstraint, ResolutionResult};
use crate::extractors::http::{fetch_json, non_empty};

/// `POST {base}/` on a cobalt instance. Works for most platforms, so it
/// closes several chains.
pub struct CobaltStrategy {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CobaltRequest<'a> {
    url: &'a str,
    download_mode: &'static str,
    video_quality: &'static str,
}

#[derive(Debug, Deserialize)]
struct CobaltResponse {
    status: String,
    url: Option<String>,
    filename: Option<String>,
    #[serde(default)]
    picker: Vec<PickerItem>,
    error: Option<CobaltError>,
}

#[derive(Debug, Deserialize)]
struct PickerItem {
    #[serde(rename = "type")]
    kind: String,
    url: String,
    thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CobaltError {
    code: String,
}

impl CobaltStrategy {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

/// Filename without its extension, as a stand-in title.
fn title_from_filename(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
        .replace('_', " ")
}

#[async_trait]
impl Strategy for CobaltStrategy {
    fn name(&self) -> &'static str {
        "cobalt"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let (download_mode, video_quality) = match quality {
            Some(QualityConstraint::AudioOnly) => ("audio", "max"),
            Some(QualityConstraint::Lowest) => ("auto", "360"),
            _ => ("auto", "max"),
        };
        let body = CobaltRequest {
            url,
            download_mode,
            video_quality,
        };

        let response: CobaltResponse = fetch_json(
            self.client
                .post(format!("{}/", self.base))
                .header("Content-Type", "application/json")
                .json(&body),
        )
        .await?;

        let (locator, thumbnail) = match response.status.as_str() {
            "redirect" | "tunnel" | "stream" => (response.url.clone(), None),
            "picker" => response
                .picker
                .iter()
                .find(|item| item.kind == "video" || item.kind == "gif")
                .map(|item| (Some(item.url.clone()), item.thumb.clone()))
                .unwrap_or((None, None)),
            "error" => {
                let code = response.error.map(|e| e.code).unwrap_or_default();
                return Err(StrategyError::Schema(format!("cobalt error {}", code)));
            }
            other => return Err(StrategyError::Schema(format!("unexpected cobalt status {}", other))),
        };
        let locator = non_empty(locator.as_deref()).ok_or(StrategyError::NoMedia)?;

        let mut result = ResolutionResult::new(self.name(), locator);
        if let Some(filename) = non_empty(response.filename.as_deref()) {
            result.title = title_from_filename(&filename);
        }
        result.thumbnail_url = thumbnail;
        result.quality_label = match quality {
            Some(QualityConstraint::AudioOnly) => "Audio",
            Some(QualityConstraint::Lowest) => "360p",
            _ => "Best",
        }
        .to_string();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_tunnel_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({"downloadMode": "audio"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "tunnel",
                "url": "https://cobalt.example/tunnel?id=abc",
                "filename": "twitter_1234_clip.mp3"
            })))
            .mount(&server)
            .await;
        let strategy = CobaltStrategy::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let result = strategy
            .attempt("https://x.com/a/status/1234", Some(QualityConstraint::AudioOnly))
            .await
            .unwrap();
        assert_eq!(result.direct_media_url, "https://cobalt.example/tunnel?id=abc");
        assert_eq!(result.title, "twitter 1234 clip");
        assert_eq!(result.quality_label, "Audio");
    }

    #[tokio::test]
    async fn test_picker_takes_first_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "picker",
                "picker": [
                    {"type": "photo", "url": "https://scontent.cdninstagram.com/p.jpg"},
                    {"type": "video", "url": "https://scontent.cdninstagram.com/v.mp4", "thumb": "https://scontent.cdninstagram.com/t.jpg"}
                ]
            })))
            .mount(&server)
            .await;
        let strategy = CobaltStrategy::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let result = strategy.attempt("https://www.instagram.com/p/abc/", None).await.unwrap();
        assert_eq!(result.direct_media_url, "https://scontent.cdninstagram.com/v.mp4");
        assert_eq!(result.thumbnail_url.as_deref(), Some("https://scontent.cdninstagram.com/t.jpg"));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": {"code": "error.api.link.unsupported"}
            })))
            .mount(&server)
            .await;
        let strategy = CobaltStrategy::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        let err = strategy.attempt("https://www.instagram.com/p/abc/", None).await.unwrap_err();
        assert!(err.to_string().contains("error.api.link.unsupported"));
    }
}

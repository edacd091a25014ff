use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use crate::core::engine::Strategy;
use crate::core::error::StrategyError;
use crate::core::metadata::{QualityConstraint, ResolutionResult};
use crate::core::validator::probe;
use crate::utils::format_size_label;

/// Last resort for unknown hosts: the link itself is the media when the
/// server says it serves `video/*`.
pub struct ContentTypeProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl ContentTypeProbe {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

fn title_from_path(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    Some(decoded.into_owned())
}

#[async_trait]
impl Strategy for ContentTypeProbe {
    fn name(&self) -> &'static str {
        "content-type-probe"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        _quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let parsed = Url::parse(url).map_err(|_| StrategyError::InvalidInput(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StrategyError::InvalidInput(url.to_string()));
        }

        let found = probe(&self.client, url, self.timeout).await?;
        if !found.is_success() {
            return Err(StrategyError::Status { status: found.status });
        }
        if !found.is_video() {
            return Err(StrategyError::NoMedia);
        }

        let mut result = ResolutionResult::new(self.name(), url.to_string());
        if let Some(title) = title_from_path(&parsed) {
            result.title = title;
        }
        result.approximate_size_label = format_size_label(found.content_length);
        result.quality_label = "Original".to_string();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn strategy() -> ContentTypeProbe {
        ContentTypeProbe::new(reqwest::Client::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_video_content_type_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/files/clip.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .insert_header("content-length", "2097152"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/files/clip.mp4", server.uri());
        let result = strategy().attempt(&url, None).await.unwrap();
        assert_eq!(result.direct_media_url, url);
        assert_eq!(result.title, "clip.mp4");
        assert_eq!(result.strategy_name, "content-type-probe");
    }

    #[tokio::test]
    async fn test_html_page_is_not_media() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .mount(&server)
            .await;

        let err = strategy()
            .attempt(&format!("{}/unknown", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::NoMedia));
    }

    #[tokio::test]
    async fn test_rejects_non_http_input() {
        let err = strategy().attempt("file:///etc/passwd", None).await.unwrap_err();
        assert!(matches!(err, StrategyError::InvalidInput(_)));
    }
}

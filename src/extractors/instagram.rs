use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::core::engine::Strategy;
use crate::core::error::StrategyError;
use crate::core::metadata::{QualityConstraint, ResolutionResult};
use crate::extractors::http::{fetch_text, non_empty};

/// Scrapes the public embed page, which still inlines the post's media.
pub struct InstagramEmbed {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl InstagramEmbed {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

/// Post shortcode from `/p/`, `/reel/`, `/reels/` or `/tv/` links.
pub fn shortcode(url: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"/(?:p|reels?|tv)/([A-Za-z0-9_-]+)").expect("shortcode pattern is valid")
    });
    pattern.captures(url).map(|c| c[1].to_string())
}

/// Embed pages carry the JSON either raw or inside an escaped string literal.
fn unescape(raw: &str) -> String {
    raw.replace("\\\\/", "/")
        .replace("\\/", "/")
        .replace("\\\\u0026", "&")
        .replace("\\u0026", "&")
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\\?"(video_url|username|display_url)\\?"\s*:\s*\\?"([^"\\]*(?:\\.[^"\\]*)*?)\\?""#)
            .expect("embed field pattern is valid")
    })
}

/// First non-empty value of `field`, which must be one of the names in
/// [`field_pattern`].
fn capture_field(html: &str, field: &str) -> Option<String> {
    field_pattern()
        .captures_iter(html)
        .filter(|c| &c[1] == field)
        .map(|c| unescape(&c[2]))
        .find(|s| !s.is_empty())
}

#[async_trait]
impl Strategy for InstagramEmbed {
    fn name(&self) -> &'static str {
        "instagram-embed"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        url: &str,
        _quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError> {
        let code = shortcode(url).ok_or_else(|| StrategyError::InvalidInput(url.to_string()))?;
        let html = fetch_text(
            self.client
                .get(format!("{}/p/{}/embed/captioned/", self.base, code))
                .header("Accept", "text/html,application/xhtml+xml"),
        )
        .await?;

        let locator = capture_field(&html, "video_url").ok_or(StrategyError::NoMedia)?;

        let mut result = ResolutionResult::new(self.name(), locator);
        result.title = "Instagram Video".to_string();
        if let Some(author) = non_empty(capture_field(&html, "username").as_deref()) {
            result.author_name = author;
        }
        result.thumbnail_url = capture_field(&html, "display_url");

        Ok(result)
    }
}

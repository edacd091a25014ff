use reqwest::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE, RANGE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "webm", "mkv", "flv", "3gp", "ts", "m3u8", "mp3", "m4a", "aac", "ogg",
    "opus", "wav",
];

/// Host fragments of CDNs that only ever serve media bytes.
const MEDIA_HOST_FRAGMENTS: &[&str] = &[
    "googlevideo.com",
    "tiktokcdn",
    "tiktokv.com",
    "muscdn.com",
    "cdninstagram.com",
    "fbcdn.net",
    "video.twimg.com",
    "akamaized.net",
];

/// What a lightweight existence probe learned about a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaProbe {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl MediaProbe {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_video(&self) -> bool {
        self.is_success() && self.mime_starts_with(&["video/"])
    }

    pub fn is_media(&self) -> bool {
        self.is_success()
            && self.mime_starts_with(&["video/", "audio/", "application/vnd.apple.mpegurl", "application/x-mpegurl"])
    }

    fn mime_starts_with(&self, prefixes: &[&str]) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase())
            .is_some_and(|ct| prefixes.iter().any(|p| ct.starts_with(p)))
    }
}

/// `HEAD` the locator, falling back to a one-byte ranged `GET` for servers
/// that refuse `HEAD`.
pub async fn probe(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<MediaProbe, reqwest::Error> {
    let mut response = client.head(url).timeout(timeout).send().await?;

    if matches!(response.status(), StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED) {
        response = client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .timeout(timeout)
            .send()
            .await?;
    }

    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    Ok(MediaProbe {
        status: response.status().as_u16(),
        content_type: header(CONTENT_TYPE),
        content_length: header(CONTENT_LENGTH).and_then(|s| s.parse().ok()),
    })
}

/// Decides whether a candidate locator yields raw media bytes.
#[derive(Clone)]
pub struct ResultValidator {
    client: Option<reqwest::Client>,
    probe_timeout: Duration,
}

impl ResultValidator {
    pub fn new(client: reqwest::Client, probe_timeout: Duration) -> Self {
        Self {
            client: Some(client),
            probe_timeout,
        }
    }

    /// Static markers only, no network.
    pub fn offline() -> Self {
        Self {
            client: None,
            probe_timeout: Duration::ZERO,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub async fn validate(&self, candidate: &str) -> bool {
        let Ok(url) = Url::parse(candidate) else {
            debug!("Rejecting unparsable locator: {}", candidate);
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if has_static_marker(&url) {
            return true;
        }

        let Some(client) = &self.client else {
            return false;
        };
        match probe(client, candidate, self.probe_timeout).await {
            Ok(found) => {
                debug!("Probe of {} -> {} {:?}", candidate, found.status, found.content_type);
                found.is_media()
            }
            Err(e) => {
                debug!("Probe of {} failed: {}", candidate, e);
                false
            }
        }
    }
}

/// Media file extension on the path, or a media-only CDN host.
pub fn has_static_marker(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    let by_extension = path
        .rsplit_once('.')
        .is_some_and(|(_, ext)| MEDIA_EXTENSIONS.contains(&ext));

    let by_host = url
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .is_some_and(|host| MEDIA_HOST_FRAGMENTS.iter().any(|f| host.contains(f)));

    by_extension || by_host
}

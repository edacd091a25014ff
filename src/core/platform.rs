use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::utils::extract_urls;

/// Hosting platforms with a dedicated strategy chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    YouTube,
    Instagram,
    TikTok,
    Twitter,
    Generic,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Self::YouTube,
        Self::Instagram,
        Self::TikTok,
        Self::Twitter,
        Self::Generic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Instagram => "Instagram",
            Self::TikTok => "TikTok",
            Self::Twitter => "Twitter/X",
            Self::Generic => "Web",
        }
    }

    /// Stable position used by per-platform counters.
    pub fn index(&self) -> usize {
        match self {
            Self::YouTube => 0,
            Self::Instagram => 1,
            Self::TikTok => 2,
            Self::Twitter => 3,
            Self::Generic => 4,
        }
    }

    /// Short form carried inside choice tokens.
    pub fn code(&self) -> &'static str {
        match self {
            Self::YouTube => "yt",
            Self::Instagram => "ig",
            Self::TikTok => "tt",
            Self::Twitter => "tw",
            Self::Generic => "web",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    // Priority order matters: YouTube first.
    fn host_fragments(&self) -> &'static [&'static str] {
        match self {
            Self::YouTube => &["youtube.com", "youtu.be"],
            Self::Instagram => &["instagram.com", "instagr.am"],
            Self::TikTok => &["tiktok.com"],
            Self::Twitter => &["twitter.com", "x.com"],
            Self::Generic => &[],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of classifying raw inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub platform: Platform,
    pub url: String,
}

/// Pulls the first URL out of `text` and tags it with a platform.
///
/// Never fails: anything unrecognized is `Generic`, and text without a URL is
/// passed through trimmed so the generic strategy can report why it failed.
pub fn classify(text: &str) -> Classified {
    let url = extract_urls(text)
        .into_iter()
        .next()
        .unwrap_or_else(|| text.trim().to_string());

    Classified {
        platform: platform_of(&url),
        url,
    }
}

fn platform_of(url: &str) -> Platform {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

    for platform in Platform::ALL {
        let matched = platform.host_fragments().iter().any(|fragment| match &host {
            Some(host) => host == fragment || host.ends_with(&format!(".{}", fragment)),
            None => url.to_ascii_lowercase().contains(fragment),
        });
        if matched {
            return platform;
        }
    }

    Platform::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_known_hosts() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Platform::YouTube),
            ("https://youtu.be/dQw4w9WgXcQ", Platform::YouTube),
            ("https://m.youtube.com/shorts/abc", Platform::YouTube),
            ("https://www.instagram.com/reel/Cx1/", Platform::Instagram),
            ("https://www.tiktok.com/@user/video/123", Platform::TikTok),
            ("https://vm.tiktok.com/ZM123/", Platform::TikTok),
            ("https://twitter.com/jack/status/20", Platform::Twitter),
            ("https://x.com/jack/status/20", Platform::Twitter),
            ("https://example.com/unknown", Platform::Generic),
        ];

        for (url, expected) in cases {
            assert_eq!(classify(url).platform, expected, "{}", url);
        }
    }

    #[test]
    fn test_extracts_url_from_surrounding_text() {
        let classified = classify("look at this https://www.tiktok.com/@user/video/123?lang=en lol");
        assert_eq!(classified.platform, Platform::TikTok);
        assert_eq!(classified.url, "https://www.tiktok.com/@user/video/123?lang=en");
    }

    #[test]
    fn test_lookalike_hosts_are_generic() {
        assert_eq!(classify("https://box.com/x.com").platform, Platform::Generic);
        assert_eq!(classify("https://notyoutube.community/v").platform, Platform::Generic);
    }

    #[test]
    fn test_youtube_wins_when_query_mentions_other_hosts() {
        let classified = classify("https://www.youtube.com/watch?v=abc&ref=tiktok.com");
        assert_eq!(classified.platform, Platform::YouTube);
    }

    #[test]
    fn test_text_without_url_degrades_to_generic() {
        let classified = classify("  hello there ");
        assert_eq!(classified.platform, Platform::Generic);
        assert_eq!(classified.url, "hello there");
    }
}

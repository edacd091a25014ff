use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    /// Delay between items of a multi-link message.
    pub batch_pacing_ms: u64,
    pub probe_timeout_secs: u64,
    /// HEAD-probe locators that carry no static media marker.
    pub probe_unknown: bool,
    pub timeouts: Timeouts,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            batch_pacing_ms: 2000,
            probe_timeout_secs: 10,
            probe_unknown: true,
            timeouts: Timeouts::default(),
            endpoints: Endpoints::default(),
        }
    }
}

/// Per-strategy time limits, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub youtube: u64,
    pub tiktok_primary: u64,
    pub tiktok_fallback: u64,
    pub instagram: u64,
    pub twitter: u64,
    pub generic: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            youtube: 30,
            tiktok_primary: 20,
            tiktok_fallback: 15,
            instagram: 20,
            twitter: 15,
            generic: 15,
        }
    }
}

/// Base URLs of the external extraction services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub youtube: String,
    pub invidious: String,
    pub tikwm: String,
    pub tiktok_oembed: String,
    pub tikdown: String,
    pub tiktok_mirror: String,
    pub instagram: String,
    pub cobalt: String,
    pub fxtwitter: String,
    pub vxtwitter: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            youtube: "https://www.youtube.com".to_string(),
            invidious: "https://yewtu.be".to_string(),
            tikwm: "https://tikwm.com".to_string(),
            tiktok_oembed: "https://www.tiktok.com".to_string(),
            tikdown: "https://tikdown.org".to_string(),
            tiktok_mirror: "https://tiktok-downloader-download-tiktok-videos-without-watermark.p.rapidapi.com".to_string(),
            instagram: "https://www.instagram.com".to_string(),
            cobalt: "https://api.cobalt.tools".to_string(),
            fxtwitter: "https://api.fxtwitter.com".to_string(),
            vxtwitter: "https://api.vxtwitter.com".to_string(),
        }
    }
}

impl Config {
    /// Defaults when `path` is `None`, otherwise the TOML file at `path`
    /// layered over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn batch_pacing(&self) -> Duration {
        Duration::from_millis(self.batch_pacing_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

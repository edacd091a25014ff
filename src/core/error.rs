use std::time::Duration;
use thiserror::Error;

use crate::core::metadata::StrategyFailure;
use crate::core::platform::Platform;

/// Failure inside a single strategy. Normalized into a [`StrategyFailure`]
/// by the engine so nothing upstream needs per-service knowledge.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service answered HTTP {status}")]
    Status { status: u16 },

    #[error("unexpected response shape: {0}")]
    Schema(String),

    #[error("no downloadable media in response")]
    NoMedia,

    #[error("unsupported link: {0}")]
    InvalidInput(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl From<serde_json::Error> for StrategyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Schema(e.to_string())
    }
}

/// Resolution-level failure surfaced to the requester.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("could not find a downloadable video on {platform} ({} attempt(s) failed)", attempts.len())]
    Exhausted {
        platform: Platform,
        attempts: Vec<StrategyFailure>,
    },
}

impl ResolveError {
    pub fn attempts(&self) -> &[StrategyFailure] {
        match self {
            Self::Exhausted { attempts, .. } => attempts,
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Exhausted { platform, .. } => *platform,
        }
    }

    /// Remediation tips shown alongside the aggregated reasons.
    pub fn hints(&self) -> Vec<&'static str> {
        let mut hints = vec!["Make sure the video is public", "Try a different link"];
        match self.platform() {
            Platform::Generic => hints.push("Send a direct link to a video file"),
            Platform::YouTube => hints.push("Try shorter videos first"),
            Platform::Instagram | Platform::TikTok | Platform::Twitter => {
                hints.push("Try again in a few minutes")
            }
        }
        hints
    }
}

/// Failure reported by the messaging channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("file is too large for the channel")]
    TooLarge,

    #[error("media URL is not reachable by the channel")]
    Unreachable,

    #[error("media format not supported: {0}")]
    Unsupported(String),

    #[error("channel error: {0}")]
    Other(String),
}

/// Delivery-phase failure. Terminal for the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("found the media but could not send it: {0}")]
    TransferFailed(#[source] ChannelError),

    #[error("could not post progress notice: {0}")]
    Notice(#[source] ChannelError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("malformed choice token: {0}")]
    MalformedToken(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

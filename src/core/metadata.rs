use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::platform::Platform;

/// Rendition the requester asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityConstraint {
    Highest,
    Lowest,
    AudioOnly,
}

impl QualityConstraint {
    pub const ALL: [QualityConstraint; 3] = [Self::Highest, Self::Lowest, Self::AudioOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Highest => "highest",
            Self::Lowest => "lowest",
            Self::AudioOnly => "audio-only",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::AudioOnly)
    }
}

impl fmt::Display for QualityConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityConstraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highest" | "best" | "high" => Ok(Self::Highest),
            "lowest" | "worst" | "low" => Ok(Self::Lowest),
            "audio-only" | "audio" | "audioonly" => Ok(Self::AudioOnly),
            other => Err(format!("unknown quality constraint: {}", other)),
        }
    }
}

/// One inbound request for resolution. Built per message or per selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub raw_url: String,
    pub platform_hint: Option<Platform>,
    pub quality: Option<QualityConstraint>,
}

impl ResolutionRequest {
    pub fn new(raw_url: impl Into<String>) -> Self {
        Self {
            raw_url: raw_url.into(),
            platform_hint: None,
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: Option<QualityConstraint>) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_platform_hint(mut self, platform: Option<Platform>) -> Self {
        self.platform_hint = platform;
        self
    }
}

/// What a strategy found. Never mutated once a strategy hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub title: String,
    pub direct_media_url: String,
    pub author_name: String,
    pub duration_seconds: u64,
    pub thumbnail_url: Option<String>,
    pub quality_label: String,
    pub approximate_size_label: String,
    pub strategy_name: String,
    /// Set when the source exposes more than one selectable rendition.
    #[serde(default)]
    pub has_alternatives: bool,
}

impl ResolutionResult {
    /// Result with placeholder metadata, filled in by strategies field by field.
    pub fn new(strategy_name: &str, direct_media_url: impl Into<String>) -> Self {
        Self {
            title: "Untitled".to_string(),
            direct_media_url: direct_media_url.into(),
            author_name: "Unknown".to_string(),
            duration_seconds: 0,
            thumbnail_url: None,
            quality_label: "Unknown".to_string(),
            approximate_size_label: "Unknown".to_string(),
            strategy_name: strategy_name.to_string(),
            has_alternatives: false,
        }
    }
}

/// Why one strategy did not produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy_name: String,
    pub reason: String,
}

impl StrategyFailure {
    pub fn new(strategy_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy_name, self.reason)
    }
}

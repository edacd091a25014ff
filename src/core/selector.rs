use std::fmt;

use crate::core::error::SelectionError;
use crate::core::metadata::{QualityConstraint, ResolutionRequest, ResolutionResult};
use crate::core::platform::Platform;
use crate::utils::{escape_markdown, format_duration};

/// What a user may pick after the first resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Quality(QualityConstraint),
    Cancel,
}

impl Choice {
    fn code(&self) -> &'static str {
        match self {
            Self::Quality(QualityConstraint::Highest) => "hi",
            Self::Quality(QualityConstraint::Lowest) => "lo",
            Self::Quality(QualityConstraint::AudioOnly) => "au",
            Self::Cancel => "x",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "hi" => Some(Self::Quality(QualityConstraint::Highest)),
            "lo" => Some(Self::Quality(QualityConstraint::Lowest)),
            "au" => Some(Self::Quality(QualityConstraint::AudioOnly)),
            "x" => Some(Self::Cancel),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Quality(QualityConstraint::Highest) => "🎥 Highest Quality",
            Self::Quality(QualityConstraint::Lowest) => "📱 Lowest Quality",
            Self::Quality(QualityConstraint::AudioOnly) => "🎵 Audio Only",
            Self::Cancel => "❌ Cancel",
        }
    }
}

/// Opaque replay token: `q1:<choice>[.<platform>]:<url>`.
///
/// Carries everything needed to re-run resolution, including a platform
/// hint, so no per-user state is kept between the offer and the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceToken(String);

impl ChoiceToken {
    const PREFIX: &'static str = "q1";

    pub fn encode(choice: Choice, url: &str, hint: Option<Platform>) -> Self {
        match hint {
            Some(platform) => Self(format!("{}:{}.{}:{}", Self::PREFIX, choice.code(), platform.code(), url)),
            None => Self(format!("{}:{}:{}", Self::PREFIX, choice.code(), url)),
        }
    }

    pub fn decode(raw: &str) -> Result<(Choice, String, Option<Platform>), SelectionError> {
        let malformed = || SelectionError::MalformedToken(raw.to_string());

        let mut parts = raw.splitn(3, ':');
        if parts.next() != Some(Self::PREFIX) {
            return Err(malformed());
        }
        let head = parts.next().ok_or_else(malformed)?;
        let (choice_code, hint) = match head.split_once('.') {
            Some((code, platform)) => (code, Some(Platform::from_code(platform).ok_or_else(malformed)?)),
            None => (head, None),
        };
        let choice = Choice::from_code(choice_code).ok_or_else(malformed)?;
        let url = parts.next().filter(|u| !u.trim().is_empty()).ok_or_else(malformed)?;

        Ok((choice, url.to_string(), hint))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChoiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub choice: Choice,
    pub label: String,
    pub token: ChoiceToken,
}

/// Offers rendition choices and turns a returned token back into a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualitySelector;

impl QualitySelector {
    pub fn new() -> Self {
        Self
    }

    /// Only unconstrained requests whose source has several renditions get
    /// a choice; a constrained replay never loops back here.
    pub fn should_offer(&self, request: &ResolutionRequest, result: &ResolutionResult) -> bool {
        request.quality.is_none() && result.has_alternatives
    }

    pub fn offer_choices(&self, request: &ResolutionRequest, result: &ResolutionResult) -> Vec<ChoiceOption> {
        if !self.should_offer(request, result) {
            return Vec::new();
        }

        QualityConstraint::ALL
            .into_iter()
            .map(Choice::Quality)
            .chain(std::iter::once(Choice::Cancel))
            .map(|choice| ChoiceOption {
                choice,
                label: choice.label().to_string(),
                token: ChoiceToken::encode(choice, &request.raw_url, request.platform_hint),
            })
            .collect()
    }

    /// The request to replay, or `None` when the user cancelled.
    pub fn replay(&self, token: &str) -> Result<Option<ResolutionRequest>, SelectionError> {
        let (choice, url, hint) = ChoiceToken::decode(token)?;
        Ok(match choice {
            Choice::Quality(quality) => Some(
                ResolutionRequest::new(url)
                    .with_quality(Some(quality))
                    .with_platform_hint(hint),
            ),
            Choice::Cancel => None,
        })
    }

    pub fn prompt_text(&self, result: &ResolutionResult) -> String {
        format!(
            "🎬 *{}*\n👤 {}\n⏱ {}\n\n_Choose a format:_",
            escape_markdown(&result.title),
            escape_markdown(&result.author_name),
            format_duration(result.duration_seconds)
        )
    }
}

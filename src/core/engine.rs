use async_trait::async_trait;
use std::ops::Deref;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::error::{ResolveError, StrategyError};
use crate::core::metadata::{QualityConstraint, ResolutionRequest, ResolutionResult, StrategyFailure};
use crate::core::platform::{classify, Platform};
use crate::core::validator::ResultValidator;
use crate::extractors::http::build_client;
use crate::extractors::StrategyRegistry;

/// One way of turning a platform link into a direct media locator,
/// backed by a single external service.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upper bound for one `attempt`.
    fn timeout(&self) -> Duration;

    async fn attempt(
        &self,
        url: &str,
        quality: Option<QualityConstraint>,
    ) -> Result<ResolutionResult, StrategyError>;
}

/// A result whose locator passed the validator. Only the engine builds these.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedResult {
    result: ResolutionResult,
    platform: Platform,
}

impl ValidatedResult {
    pub(crate) fn new(result: ResolutionResult, platform: Platform) -> Self {
        Self { result, platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn into_inner(self) -> ResolutionResult {
        self.result
    }
}

impl Deref for ValidatedResult {
    type Target = ResolutionResult;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

pub struct ResolutionEngine {
    registry: StrategyRegistry,
    validator: ResultValidator,
}

impl ResolutionEngine {
    pub fn new(registry: StrategyRegistry, validator: ResultValidator) -> Self {
        Self { registry, validator }
    }

    /// Built-in chains plus a validator that probes unmarked locators
    /// unless `probe_unknown` is off.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let registry = StrategyRegistry::from_config(config)?;
        let validator = if config.probe_unknown {
            ResultValidator::new(build_client(&config.user_agent)?, config.probe_timeout())
        } else {
            ResultValidator::offline()
        };
        Ok(Self::new(registry, validator))
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Hard bound for one `resolve` call on `platform`: every strategy
    /// timing out, each followed by a validator probe.
    pub fn ceiling(&self, platform: Platform) -> Duration {
        self.registry
            .strategies_for(platform)
            .iter()
            .map(|s| s.timeout() + self.validator.probe_timeout())
            .sum()
    }

    /// Runs the platform's strategies in order and returns the first result
    /// whose locator validates.
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<ValidatedResult, ResolveError> {
        let classified = classify(&request.raw_url);
        let platform = request.platform_hint.unwrap_or(classified.platform);
        let ceiling = self.ceiling(platform);

        info!("Resolving {} link: {}", platform, classified.url);

        let mut attempts = Vec::new();
        let finished = tokio::time::timeout(
            ceiling,
            self.run_chain(platform, &classified.url, request.quality, &mut attempts),
        )
        .await;

        match finished {
            Ok(Some(result)) => Ok(ValidatedResult::new(result, platform)),
            Ok(None) => {
                warn!("All {} strategies failed for {}", platform, classified.url);
                Err(ResolveError::Exhausted { platform, attempts })
            }
            Err(_) => {
                warn!("Resolution of {} hit the {}s ceiling", classified.url, ceiling.as_secs());
                attempts.push(StrategyFailure::new(
                    "engine",
                    format!("gave up after {}s", ceiling.as_secs()),
                ));
                Err(ResolveError::Exhausted { platform, attempts })
            }
        }
    }

    async fn run_chain(
        &self,
        platform: Platform,
        url: &str,
        quality: Option<QualityConstraint>,
        attempts: &mut Vec<StrategyFailure>,
    ) -> Option<ResolutionResult> {
        for strategy in self.registry.strategies_for(platform) {
            debug!("Trying strategy {} for {}", strategy.name(), url);

            let outcome = match tokio::time::timeout(strategy.timeout(), strategy.attempt(url, quality)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(StrategyError::Timeout(strategy.timeout())),
            };

            match outcome {
                Ok(result) => {
                    if self.validator.validate(&result.direct_media_url).await {
                        info!("Resolved via {}: {}", strategy.name(), result.title);
                        return Some(result);
                    }
                    warn!(
                        "{} returned a non-direct locator: {}",
                        strategy.name(),
                        result.direct_media_url
                    );
                    attempts.push(StrategyFailure::new(
                        strategy.name(),
                        format!("not a direct media link: {}", result.direct_media_url),
                    ));
                }
                Err(e) => {
                    warn!("{} failed: {}", strategy.name(), e);
                    attempts.push(StrategyFailure::new(strategy.name(), e.to_string()));
                }
            }
        }

        None
    }
}

//! Resolution strategies, one per external extraction service, and the
//! registry that orders them per platform.

pub mod cobalt;
pub mod generic;
pub mod http;
pub mod instagram;
pub mod invidious;
pub mod tiktok;
pub mod twitter;
pub mod youtube;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::core::engine::Strategy;
use crate::core::platform::Platform;

pub use cobalt::CobaltStrategy;
pub use generic::ContentTypeProbe;
pub use instagram::InstagramEmbed;
pub use invidious::InvidiousApi;
pub use tiktok::{TikTokMirror, TikTokOembedCompanion, TikwmApi};
pub use twitter::{FxTwitterApi, VxTwitterApi};
pub use youtube::YouTubeWatchPage;

/// Ordered strategy chains, most reliable first.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    chains: HashMap<Platform, Vec<Arc<dyn Strategy>>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `strategy` to the end of `platform`'s chain.
    pub fn register(&mut self, platform: Platform, strategy: Arc<dyn Strategy>) {
        self.chains.entry(platform).or_default().push(strategy);
    }

    pub fn strategies_for(&self, platform: Platform) -> &[Arc<dyn Strategy>] {
        self.chains.get(&platform).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names_for(&self, platform: Platform) -> Vec<&'static str> {
        self.strategies_for(platform).iter().map(|s| s.name()).collect()
    }

    /// The built-in chains, pointed at the endpoints in `config`.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = http::build_client(&config.user_agent)?;
        let endpoints = &config.endpoints;
        let secs = Duration::from_secs;
        let t = &config.timeouts;

        let mut registry = Self::new();

        registry.register(
            Platform::YouTube,
            Arc::new(YouTubeWatchPage::new(client.clone(), &endpoints.youtube, secs(t.youtube))),
        );
        registry.register(
            Platform::YouTube,
            Arc::new(InvidiousApi::new(client.clone(), &endpoints.invidious, secs(t.youtube))),
        );

        registry.register(
            Platform::TikTok,
            Arc::new(TikwmApi::new(client.clone(), &endpoints.tikwm, secs(t.tiktok_primary))),
        );
        registry.register(
            Platform::TikTok,
            Arc::new(TikTokOembedCompanion::new(
                client.clone(),
                &endpoints.tiktok_oembed,
                &endpoints.tikdown,
                secs(t.tiktok_fallback),
            )),
        );
        registry.register(
            Platform::TikTok,
            Arc::new(TikTokMirror::new(client.clone(), &endpoints.tiktok_mirror, secs(t.tiktok_fallback))),
        );

        registry.register(
            Platform::Instagram,
            Arc::new(InstagramEmbed::new(client.clone(), &endpoints.instagram, secs(t.instagram))),
        );
        registry.register(
            Platform::Instagram,
            Arc::new(CobaltStrategy::new(client.clone(), &endpoints.cobalt, secs(t.instagram))),
        );

        registry.register(
            Platform::Twitter,
            Arc::new(FxTwitterApi::new(client.clone(), &endpoints.fxtwitter, secs(t.twitter))),
        );
        registry.register(
            Platform::Twitter,
            Arc::new(VxTwitterApi::new(client.clone(), &endpoints.vxtwitter, secs(t.twitter))),
        );
        registry.register(
            Platform::Twitter,
            Arc::new(CobaltStrategy::new(client.clone(), &endpoints.cobalt, secs(t.twitter))),
        );

        registry.register(
            Platform::Generic,
            Arc::new(ContentTypeProbe::new(client, secs(t.generic))),
        );

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_are_ordered() {
        let registry = StrategyRegistry::from_config(&Config::default()).unwrap();

        assert_eq!(registry.names_for(Platform::YouTube), vec!["youtube-watch-page", "invidious"]);
        assert_eq!(
            registry.names_for(Platform::TikTok),
            vec!["tikwm", "tiktok-oembed+tikdown", "tiktok-mirror"]
        );
        assert_eq!(registry.names_for(Platform::Instagram), vec!["instagram-embed", "cobalt"]);
        assert_eq!(registry.names_for(Platform::Twitter), vec!["fxtwitter", "vxtwitter", "cobalt"]);
        assert_eq!(registry.names_for(Platform::Generic), vec!["content-type-probe"]);
    }

    #[test]
    fn test_timeouts_come_from_config() {
        let mut config = Config::default();
        config.timeouts.tiktok_primary = 3;
        let registry = StrategyRegistry::from_config(&config).unwrap();

        let timeouts: Vec<_> = registry
            .strategies_for(Platform::TikTok)
            .iter()
            .map(|s| s.timeout().as_secs())
            .collect();
        assert_eq!(timeouts, vec![3, 15, 15]);
    }

    #[test]
    fn test_unregistered_platform_has_empty_chain() {
        assert!(StrategyRegistry::new().strategies_for(Platform::YouTube).is_empty());
    }
}

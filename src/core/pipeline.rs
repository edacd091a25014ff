//! End-to-end flow for one chat interaction: classify, resolve, validate,
//! count, then either deliver or offer rendition choices.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::delivery::{Channel, ChatId, DeliveryCoordinator, DeliverySession};
use crate::core::engine::ResolutionEngine;
use crate::core::error::{DeliveryError, ResolveError, SelectionError};
use crate::core::ledger::{UsageLedger, UsageSnapshot};
use crate::core::metadata::{QualityConstraint, ResolutionRequest};
use crate::core::selector::{ChoiceOption, QualitySelector};
use crate::utils::{escape_markdown, extract_urls};

/// How one request ended.
#[derive(Debug)]
pub enum Outcome {
    Delivered(DeliverySession),
    ChoicesOffered(Vec<ChoiceOption>),
    ResolutionFailed(ResolveError),
    TransferFailed(DeliveryError),
    Cancelled,
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

pub struct Pipeline {
    engine: Arc<ResolutionEngine>,
    selector: QualitySelector,
    ledger: Arc<UsageLedger>,
    delivery: DeliveryCoordinator,
    channel: Arc<dyn Channel>,
    pacing: Duration,
}

impl Pipeline {
    pub fn new(
        engine: Arc<ResolutionEngine>,
        ledger: Arc<UsageLedger>,
        channel: Arc<dyn Channel>,
        pacing: Duration,
    ) -> Self {
        Self {
            engine,
            selector: QualitySelector::new(),
            ledger,
            delivery: DeliveryCoordinator::new(Arc::clone(&channel)),
            channel,
            pacing,
        }
    }

    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    pub fn usage_report(&self) -> UsageSnapshot {
        self.ledger.snapshot()
    }

    /// Handles every URL found in `text`, one after another with the pacing
    /// interval in between. A failed item does not stop the rest.
    pub async fn handle_message(
        &self,
        chat: ChatId,
        text: &str,
        quality: Option<QualityConstraint>,
    ) -> Vec<Outcome> {
        let urls = extract_urls(text);
        let mut outcomes = Vec::with_capacity(urls.len());

        for (i, url) in urls.into_iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                info!("Pacing batch: waiting {}ms before next link", self.pacing.as_millis());
                tokio::time::sleep(self.pacing).await;
            }
            let request = ResolutionRequest::new(url).with_quality(quality);
            outcomes.push(self.handle_request(chat, request).await);
        }

        outcomes
    }

    /// Replays a choice token handed back by the channel.
    pub async fn handle_selection(&self, chat: ChatId, token: &str) -> Result<Outcome, SelectionError> {
        match self.selector.replay(token)? {
            Some(request) => Ok(self.handle_request(chat, request).await),
            None => {
                self.notify(chat, "👌 Selection cancelled.").await;
                Ok(Outcome::Cancelled)
            }
        }
    }

    pub async fn handle_request(&self, chat: ChatId, request: ResolutionRequest) -> Outcome {
        let media = match self.engine.resolve(&request).await {
            Ok(media) => media,
            Err(e) => {
                self.notify(chat, &resolution_failed_text(&e)).await;
                return Outcome::ResolutionFailed(e);
            }
        };

        if self.selector.should_offer(&request, &media) {
            let options = self.selector.offer_choices(&request, &media);
            let prompt = self.selector.prompt_text(&media);
            if let Err(e) = self.channel.offer_choices(chat, &prompt, &options).await {
                warn!("Could not present choices: {}", e);
            }
            return Outcome::ChoicesOffered(options);
        }

        self.ledger.record(media.platform());

        match self.delivery.deliver(chat, &media, request.quality).await {
            Ok(session) => Outcome::Delivered(session),
            Err(e) => Outcome::TransferFailed(e),
        }
    }

    async fn notify(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.channel.send_notice(chat, text).await {
            warn!("Could not notify chat {}: {}", chat, e);
        }
    }
}

pub fn resolution_failed_text(error: &ResolveError) -> String {
    let mut text = format!(
        "❌ *Download Failed!*\n\nCould not find a downloadable video on {}.\n\n*Tried:*\n",
        error.platform()
    );
    for attempt in error.attempts() {
        text.push_str(&format!(
            "• {}: {}\n",
            escape_markdown(&attempt.strategy_name),
            escape_markdown(&attempt.reason)
        ));
    }
    text.push_str("\n*💡 Tips:*\n");
    for hint in error.hints() {
        text.push_str(&format!("• {}\n", hint));
    }
    text
}

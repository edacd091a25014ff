use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::engine::ValidatedResult;
use crate::core::error::{ChannelError, DeliveryError};
use crate::core::metadata::QualityConstraint;
use crate::core::platform::Platform;
use crate::core::selector::ChoiceOption;
use crate::utils::escape_markdown;

pub type ChatId = i64;
pub type NoticeId = i64;

/// The messaging channel the media is handed to. Media is always passed by
/// reference URL; the channel fetches it itself.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn send_notice(&self, chat: ChatId, text: &str) -> Result<NoticeId, ChannelError>;

    async fn edit_notice(&self, chat: ChatId, notice: NoticeId, text: &str) -> Result<(), ChannelError>;

    async fn send_video(&self, chat: ChatId, media_url: &str, caption: &str) -> Result<(), ChannelError>;

    async fn send_audio(&self, chat: ChatId, media_url: &str, caption: &str) -> Result<(), ChannelError>;

    async fn offer_choices(&self, chat: ChatId, text: &str, options: &[ChoiceOption]) -> Result<(), ChannelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPhase {
    Announced,
    Transferring,
    Complete,
    Failed,
}

impl DeliveryPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    fn can_move_to(&self, next: DeliveryPhase) -> bool {
        matches!(
            (self, next),
            (Self::Announced, Self::Transferring)
                | (Self::Announced, Self::Failed)
                | (Self::Transferring, Self::Complete)
                | (Self::Transferring, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySession {
    pub request_id: u64,
    pub platform: Platform,
    pub phase: DeliveryPhase,
}

impl DeliverySession {
    fn advance(&mut self, next: DeliveryPhase) {
        debug_assert!(self.phase.can_move_to(next), "{:?} -> {:?}", self.phase, next);
        debug!("Session {} {:?} -> {:?}", self.request_id, self.phase, next);
        self.phase = next;
    }
}

/// Drives one validated result through announce, transfer and the final
/// notice edit. Transfer failures are terminal and never retried here.
pub struct DeliveryCoordinator {
    channel: Arc<dyn Channel>,
    next_id: AtomicU64,
}

impl DeliveryCoordinator {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            channel,
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn deliver(
        &self,
        chat: ChatId,
        media: &ValidatedResult,
        quality: Option<QualityConstraint>,
    ) -> Result<DeliverySession, DeliveryError> {
        let platform = media.platform();
        let audio = quality.is_some_and(|q| q.is_audio());
        let mut session = DeliverySession {
            request_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            platform,
            phase: DeliveryPhase::Announced,
        };

        let notice = self
            .channel
            .send_notice(chat, &announce_text(platform, media))
            .await
            .map_err(DeliveryError::Notice)?;

        session.advance(DeliveryPhase::Transferring);
        info!("Sending {} from {}: {}", if audio { "audio" } else { "video" }, platform, media.title);

        let caption = caption_text(platform, media, audio);
        let sent = if audio {
            self.channel.send_audio(chat, &media.direct_media_url, &caption).await
        } else {
            self.channel.send_video(chat, &media.direct_media_url, &caption).await
        };

        match sent {
            Ok(()) => {
                session.advance(DeliveryPhase::Complete);
                self.edit(chat, notice, &complete_text(platform, audio)).await;
                Ok(session)
            }
            Err(e) => {
                warn!("Transfer of {} failed: {}", media.direct_media_url, e);
                session.advance(DeliveryPhase::Failed);
                self.edit(chat, notice, &transfer_failed_text(&e)).await;
                Err(DeliveryError::TransferFailed(e))
            }
        }
    }

    // The final edit is best effort: the session outcome is already decided.
    async fn edit(&self, chat: ChatId, notice: NoticeId, text: &str) {
        if let Err(e) = self.channel.edit_notice(chat, notice, text).await {
            warn!("Could not update notice {}: {}", notice, e);
        }
    }
}

pub fn announce_text(platform: Platform, media: &ValidatedResult) -> String {
    format!(
        "⬇️ *Downloading from {}...*\n\n📹 *Title:* {}\n👤 *Author:* {}\n🎯 *Quality:* {}\n⚡ *Method:* {}\n\n_Processing your video..._",
        platform,
        escape_markdown(&media.title),
        escape_markdown(&media.author_name),
        media.quality_label,
        media.strategy_name
    )
}

pub fn caption_text(platform: Platform, media: &ValidatedResult, audio: bool) -> String {
    if audio {
        format!(
            "🎵 *Audio from {}*\n\n📝 *{}*\n👤 {}",
            platform,
            escape_markdown(&media.title),
            escape_markdown(&media.author_name)
        )
    } else {
        format!(
            "📹 *{} Video*\n\n📝 *{}*\n👤 {}\n🎯 {} · {}",
            platform,
            escape_markdown(&media.title),
            escape_markdown(&media.author_name),
            media.quality_label,
            media.approximate_size_label
        )
    }
}

pub fn complete_text(platform: Platform, audio: bool) -> String {
    format!(
        "✅ *Download Complete!*\n\nEnjoy your {} from {}! 🎬",
        if audio { "audio" } else { "video" },
        platform
    )
}

pub fn transfer_failed_text(error: &ChannelError) -> String {
    let hint = match error {
        ChannelError::TooLarge => "• Video is too large, try a shorter one or audio only",
        ChannelError::Unreachable => "• The video link expired or is not publicly accessible",
        ChannelError::Unsupported(_) => "• The video format is not supported, try audio only",
        ChannelError::Other(_) => "• Try again in a moment",
    };
    format!(
        "❌ *Video Processing Failed!*\n\nThe video was found but could not be sent.\n*Error:* {}\n\n*Possible reasons:*\n{}\n\n💡 Send the link again to retry",
        escape_markdown(&error.to_string()),
        hint
    )
}

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::core::delivery::{Channel, ChatId, NoticeId};
use crate::core::error::ChannelError;
use crate::core::selector::ChoiceOption;

/// Channel that renders every message to stdout. Media is never fetched;
/// the locator is printed for the user to open.
#[derive(Default)]
pub struct ConsoleChannel {
    next_notice: AtomicI64,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    async fn send_notice(&self, chat: ChatId, text: &str) -> Result<NoticeId, ChannelError> {
        let id = self.next_notice.fetch_add(1, Ordering::Relaxed) + 1;
        println!("[chat {} · notice {}]\n{}\n", chat, id, text);
        Ok(id)
    }

    async fn edit_notice(&self, chat: ChatId, notice: NoticeId, text: &str) -> Result<(), ChannelError> {
        println!("[chat {} · notice {} edited]\n{}\n", chat, notice, text);
        Ok(())
    }

    async fn send_video(&self, chat: ChatId, media_url: &str, caption: &str) -> Result<(), ChannelError> {
        println!("[chat {} · video]\n{}\n{}\n", chat, caption, media_url);
        Ok(())
    }

    async fn send_audio(&self, chat: ChatId, media_url: &str, caption: &str) -> Result<(), ChannelError> {
        println!("[chat {} · audio]\n{}\n{}\n", chat, caption, media_url);
        Ok(())
    }

    async fn offer_choices(&self, chat: ChatId, text: &str, options: &[ChoiceOption]) -> Result<(), ChannelError> {
        println!("[chat {} · choices]\n{}", chat, text);
        for option in options {
            println!("  {:<20} snipsave choose '{}'", option.label, option.token);
        }
        println!();
        Ok(())
    }
}

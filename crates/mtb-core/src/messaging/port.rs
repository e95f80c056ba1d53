use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, PhotoRef},
    messaging::types::{InlineKeyboard, MessagingCapabilities},
    Result,
};

/// What the core needs from a chat transport to show its replies.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Photos as one album; the caption goes on the first photo.
    async fn send_photo_album(
        &self,
        chat_id: ChatId,
        photos: &[PhotoRef],
        caption_html: &str,
    ) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

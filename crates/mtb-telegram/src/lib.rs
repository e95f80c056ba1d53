//! Telegram adapter (teloxide).
//!
//! This crate implements the `mtb-core` MessagingPort over the Telegram Bot API
//! and decodes updates into core inputs.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto,
        ParseMode,
    },
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use mtb_core::{
    domain::{ChatId, MessageId, MessageRef, PhotoRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    fn message_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    fn markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::debug!(wait = ?d, "telegram rate limit, retrying");
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities::default()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
            })
            .await?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        let markup = Self::markup(keyboard);
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
                    .reply_markup(markup.clone())
            })
            .await?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn send_photo_album(
        &self,
        chat_id: ChatId,
        photos: &[PhotoRef],
        caption_html: &str,
    ) -> Result<()> {
        match photos {
            [] => Ok(()),
            // sendMediaGroup wants at least two items.
            [single] => {
                self.with_retry(|| {
                    let req = self
                        .bot
                        .send_photo(Self::tg_chat(chat_id), InputFile::file_id(single.0.clone()));
                    if caption_html.is_empty() {
                        req
                    } else {
                        req.caption(caption_html.to_string())
                            .parse_mode(ParseMode::Html)
                    }
                })
                .await?;
                Ok(())
            }
            _ => {
                let media: Vec<InputMedia> = photos
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let photo = InputMediaPhoto::new(InputFile::file_id(p.0.clone()));
                        let photo = if i == 0 && !caption_html.is_empty() {
                            photo
                                .caption(caption_html.to_string())
                                .parse_mode(ParseMode::Html)
                        } else {
                            photo
                        };
                        InputMedia::Photo(photo)
                    })
                    .collect();
                self.with_retry(|| {
                    self.bot
                        .send_media_group(Self::tg_chat(chat_id), media.clone())
                })
                .await?;
                Ok(())
            }
        }
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}

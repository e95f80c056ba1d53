//! Telegram update handlers.
//!
//! Each handler decodes one update into a core `Input`, hands it to the
//! `Marketplace` and renders whatever replies come back.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, User},
};

use mtb_core::{
    conversation::{InboundEvent, Input},
    domain::{ChatId, UserId},
    render,
};

use crate::router::AppState;

mod callback;
mod message;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    message::handle_message(bot, msg, state).await
}

fn inbound(user: &User, chat: ChatId, input: Input) -> InboundEvent {
    InboundEvent {
        user: UserId(user.id.0 as i64),
        chat,
        username: user.username.clone(),
        is_bot: user.is_bot,
        input,
    }
}

/// Run one event through the marketplace and show the result.
async fn dispatch(state: &AppState, event: InboundEvent, callback_id: Option<&str>) {
    let chat = event.chat;
    let user = event.user;
    let replies = state.market.handle(event).await;
    if let Err(e) = render::deliver(state.messenger.as_ref(), chat, callback_id, replies).await {
        tracing::error!(user = %user, chat = chat.0, error = %e, "failed to deliver replies");
    }
}

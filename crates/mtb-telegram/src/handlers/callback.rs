use std::sync::Arc;

use teloxide::prelude::*;

use mtb_core::{
    conversation::{prompts, Action, Input},
    domain::ChatId,
};

use crate::router::AppState;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let chat_id = q.message.as_ref().map(|m| ChatId(m.chat.id.0));
    let data = q.data.as_deref().unwrap_or_default();

    // Always answer the callback query, even when there is nothing to do.
    let Some(chat_id) = chat_id else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    let Some(action) = Action::decode(data) else {
        tracing::debug!(user = q.from.id.0, data, "stale or unknown callback data");
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(prompts::STALE_ACTION)
            .await;
        return Ok(());
    };

    tracing::debug!(user = q.from.id.0, %action, "callback");
    let event = super::inbound(&q.from, chat_id, Input::Action(action));
    super::dispatch(&state, event, Some(&q.id)).await;
    Ok(())
}

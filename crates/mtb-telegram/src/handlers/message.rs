use std::sync::Arc;

use teloxide::prelude::*;

use mtb_core::{
    conversation::{prompts, Action, Input},
    domain::{ChatId, GeoPoint, PhotoRef},
};

use crate::router::AppState;

/// What a text message means before it reaches the state machine.
#[derive(Debug, PartialEq)]
enum Decoded {
    Input(Input),
    UnknownCommand(String),
}

/// `/name@bot args` → `name`, lowercased.
fn command_name(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix('/')?;
    let word = rest.split_whitespace().next().unwrap_or_default();
    let name = word.split('@').next().unwrap_or_default();
    Some(name.to_lowercase())
}

fn decode_text(text: &str) -> Decoded {
    match command_name(text) {
        Some(name) => match Action::from_command(&name) {
            Some(action) => Decoded::Input(Input::Action(action)),
            None => Decoded::UnknownCommand(name),
        },
        None => Decoded::Input(Input::Text(text.to_string())),
    }
}

fn decode_message(msg: &Message) -> Option<Decoded> {
    if let Some(text) = msg.text() {
        return Some(decode_text(text));
    }
    // Telegram lists sizes smallest first.
    if let Some(best) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(Decoded::Input(Input::Photo(PhotoRef(best.file.id.clone()))));
    }
    if let Some(loc) = msg.location() {
        return GeoPoint::new(loc.latitude, loc.longitude).map(|p| Decoded::Input(Input::Location(p)));
    }
    None
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    match decode_message(&msg) {
        Some(Decoded::Input(input)) => {
            let event = super::inbound(user, chat_id, input);
            super::dispatch(&state, event, None).await;
        }
        Some(Decoded::UnknownCommand(name)) => {
            tracing::debug!(user = user.id.0, command = %name, "unknown command");
            let _ = bot.send_message(msg.chat.id, prompts::UNKNOWN_COMMAND).await;
        }
        None => {
            tracing::debug!(user = user.id.0, "unsupported message kind ignored");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_decode_to_actions() {
        assert_eq!(
            decode_text("/start"),
            Decoded::Input(Input::Action(Action::Start))
        );
        assert_eq!(
            decode_text("/Buscar@mercado_bot ahora"),
            Decoded::Input(Input::Action(Action::Search))
        );
        assert_eq!(
            decode_text("/cancel"),
            Decoded::Input(Input::Action(Action::Cancel))
        );
    }

    #[test]
    fn unknown_command_is_flagged() {
        assert_eq!(
            decode_text("/foo"),
            Decoded::UnknownCommand("foo".to_string())
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(
            decode_text("Silla roja"),
            Decoded::Input(Input::Text("Silla roja".to_string()))
        );
    }
}

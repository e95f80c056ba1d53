//! Turn conversation replies into messenger calls.

use crate::{
    conversation::{
        action::Action,
        reply::{CardContext, Menu, MenuOption, Reply, ResultPage},
    },
    domain::ChatId,
    formatting::{card_caption, entry_label, escape_html, truncate_chars},
    listing::Listing,
    messaging::{
        port::MessagingPort,
        types::{InlineButton, InlineKeyboard},
    },
    Result,
};

/// Telegram refuses callback answers longer than this.
const MAX_TOAST_CHARS: usize = 200;

const CARD_FOOTER: &str = "⬆️⬆️ Anuncio completo arriba ⬆️⬆️";

pub fn keyboard(menu: &Menu) -> InlineKeyboard {
    InlineKeyboard::new(
        menu.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|o| InlineButton {
                        label: o.label.clone(),
                        callback_data: o.action.encode(),
                    })
                    .collect()
            })
            .collect(),
    )
}

/// Show `replies` in `chat`, answering the callback that caused them if any.
///
/// A lone notice in answer to a button press becomes the callback toast
/// instead of a chat message.
pub async fn deliver(
    port: &dyn MessagingPort,
    chat: ChatId,
    callback_id: Option<&str>,
    replies: Vec<Reply>,
) -> Result<()> {
    if let Some(id) = callback_id {
        if let [Reply::Notice(text)] = replies.as_slice() {
            return port
                .answer_callback_query(id, Some(&truncate_chars(text, MAX_TOAST_CHARS)))
                .await;
        }
        // Stop the client spinner before the slower sends.
        if let Err(e) = port.answer_callback_query(id, None).await {
            tracing::warn!(error = %e, "answer_callback_query failed");
        }
    }

    for reply in replies {
        match reply {
            Reply::Prompt { text, menu } => send_text(port, chat, &escape_html(&text), &menu).await?,
            Reply::Notice(text) => {
                port.send_html(chat, &escape_html(&text)).await?;
            }
            Reply::Card { listing, context } => send_card(port, chat, &listing, context).await?,
            Reply::ResultList(page) => send_results(port, chat, &page).await?,
        }
    }
    Ok(())
}

async fn send_text(port: &dyn MessagingPort, chat: ChatId, html: &str, menu: &Menu) -> Result<()> {
    if menu.is_empty() {
        port.send_html(chat, html).await?;
    } else {
        port.send_inline_keyboard(chat, html, keyboard(menu)).await?;
    }
    Ok(())
}

fn card_header(listing: &Listing, context: CardContext) -> Option<String> {
    match context {
        CardContext::Created => Some(format!("✅ Anuncio #{} publicado exitosamente!", listing.id)),
        CardContext::Updated => Some(format!("✅ Anuncio #{} editado exitosamente!", listing.id)),
        CardContext::SearchResult { index, total, .. } => {
            Some(format!("🔎 Anuncio {} de {}", index + 1, total))
        }
        CardContext::Owner => None,
    }
}

fn card_menu(listing: &Listing, context: CardContext) -> Menu {
    let id = listing.id;
    match context {
        CardContext::Created | CardContext::Updated => Menu::none(),
        CardContext::Owner => Menu::none()
            .row(vec![
                MenuOption::new("✏️ Editar", Action::Edit(id)),
                MenuOption::new("🗑 Eliminar", Action::Delete(id)),
            ])
            .single("📋 Mis anuncios", Action::MyListings)
            .cancel(),
        CardContext::SearchResult {
            deletable,
            editable,
            ..
        } => {
            let mut manage = Vec::new();
            if editable {
                manage.push(MenuOption::new("✏️ Editar", Action::Edit(id)));
            }
            if deletable {
                manage.push(MenuOption::new("🗑 Eliminar", Action::Delete(id)));
            }
            Menu::none()
                .row(vec![
                    MenuOption::new("⬅️ Anterior", Action::PrevItem),
                    MenuOption::new("Siguiente ➡️", Action::NextItem),
                ])
                .row(manage)
                .single("🔙 Volver a resultados", Action::BackToResults)
                .cancel()
        }
    }
}

async fn send_card(
    port: &dyn MessagingPort,
    chat: ChatId,
    listing: &Listing,
    context: CardContext,
) -> Result<()> {
    let caps = port.capabilities();
    let caption = card_caption(listing, card_header(listing, context).as_deref());
    let photos: Vec<_> = listing.photos.iter().cloned().collect();

    // An over-long caption cannot be cut without breaking its markup, so it
    // goes out as its own message after the photos.
    let fits = caption.chars().count() <= caps.max_caption_len;
    for (i, chunk) in photos.chunks(caps.max_album_len.max(1)).enumerate() {
        let album_caption = if i == 0 && fits { caption.as_str() } else { "" };
        port.send_photo_album(chat, chunk, album_caption).await?;
    }
    if !fits {
        port.send_html(chat, &caption).await?;
    }

    let menu = card_menu(listing, context);
    if !menu.is_empty() {
        port.send_inline_keyboard(chat, CARD_FOOTER, keyboard(&menu))
            .await?;
    }
    Ok(())
}

fn results_menu(page: &ResultPage) -> Menu {
    let entries = page
        .entries
        .iter()
        .enumerate()
        .map(|(i, l)| MenuOption::new(entry_label(l), Action::Open(page.first_index + i)))
        .collect();

    let mut nav = Vec::new();
    if page.has_prev() {
        nav.push(MenuOption::new("⬅️ Anterior", Action::PrevPage));
    }
    if page.has_next() {
        nav.push(MenuOption::new("Siguiente ➡️", Action::NextPage));
    }
    Menu::none().grid(entries, 1).row(nav).cancel()
}

async fn send_results(port: &dyn MessagingPort, chat: ChatId, page: &ResultPage) -> Result<()> {
    let mut text = crate::conversation::prompts::results_header(page.total);
    if page.page_count > 1 {
        text.push_str(&format!("\nPágina {} de {}", page.page + 1, page.page_count));
    }
    send_text(port, chat, &escape_html(&text), &results_menu(page)).await
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{MessageId, MessageRef, PhotoRef},
        listing::{tests::sample, tests::t0, FieldEdit},
        messaging::types::MessagingCapabilities,
    };

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        Html(String),
        Keyboard(String, InlineKeyboard),
        Album(Vec<PhotoRef>, String),
        Answer(String, Option<String>),
    }

    #[derive(Default)]
    pub(crate) struct FakeMessenger {
        pub(crate) calls: Mutex<Vec<Call>>,
    }

    impl FakeMessenger {
        fn record(&self, call: Call, chat_id: ChatId) -> MessageRef {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            MessageRef {
                chat_id,
                message_id: MessageId(calls.len() as i32),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities::default()
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            Ok(self.record(Call::Html(html.to_string()), chat_id))
        }

        async fn send_inline_keyboard(
            &self,
            chat_id: ChatId,
            html: &str,
            keyboard: InlineKeyboard,
        ) -> Result<MessageRef> {
            Ok(self.record(Call::Keyboard(html.to_string(), keyboard), chat_id))
        }

        async fn send_photo_album(
            &self,
            chat_id: ChatId,
            photos: &[PhotoRef],
            caption_html: &str,
        ) -> Result<()> {
            self.record(
                Call::Album(photos.to_vec(), caption_html.to_string()),
                chat_id,
            );
            Ok(())
        }

        async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
            self.record(
                Call::Answer(callback_id.to_string(), text.map(str::to_string)),
                ChatId(0),
            );
            Ok(())
        }
    }

    fn callbacks(kb: &InlineKeyboard) -> Vec<String> {
        kb.buttons().map(|b| b.callback_data.clone()).collect()
    }

    #[tokio::test]
    async fn lone_notice_on_callback_is_a_toast() {
        let fake = FakeMessenger::default();
        deliver(&fake, ChatId(1), Some("cb"), vec![Reply::notice("⛔ Fin")])
            .await
            .unwrap();
        assert_eq!(
            fake.calls(),
            vec![Call::Answer("cb".into(), Some("⛔ Fin".into()))]
        );
    }

    #[tokio::test]
    async fn notice_from_text_is_a_message() {
        let fake = FakeMessenger::default();
        deliver(&fake, ChatId(1), None, vec![Reply::notice("a < b")])
            .await
            .unwrap();
        assert_eq!(fake.calls(), vec![Call::Html("a &lt; b".into())]);
    }

    #[tokio::test]
    async fn callback_is_answered_before_prompts() {
        let fake = FakeMessenger::default();
        deliver(
            &fake,
            ChatId(1),
            Some("cb"),
            vec![Reply::prompt("Hola", Menu::main())],
        )
        .await
        .unwrap();
        let calls = fake.calls();
        assert_eq!(calls[0], Call::Answer("cb".into(), None));
        match &calls[1] {
            Call::Keyboard(text, kb) => {
                assert_eq!(text, "Hola");
                assert_eq!(callbacks(kb), vec!["new", "search", "mine"]);
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn created_card_is_album_without_footer() {
        let fake = FakeMessenger::default();
        let listing = sample(4, 1, "Mesa");
        deliver(
            &fake,
            ChatId(1),
            None,
            vec![Reply::card(listing, CardContext::Created)],
        )
        .await
        .unwrap();
        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::Album(photos, caption) => {
                assert_eq!(photos.len(), 1);
                assert!(caption.contains("Anuncio #4 publicado exitosamente"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_card_buttons_follow_permissions() {
        let fake = FakeMessenger::default();
        let listing = sample(4, 1, "Mesa");
        let context = CardContext::SearchResult {
            index: 0,
            total: 2,
            deletable: true,
            editable: false,
        };
        deliver(&fake, ChatId(1), None, vec![Reply::card(listing, context)])
            .await
            .unwrap();
        let calls = fake.calls();
        let Some(Call::Keyboard(text, kb)) = calls.last() else {
            panic!("no footer keyboard");
        };
        assert_eq!(text, CARD_FOOTER);
        let data = callbacks(kb);
        assert!(data.contains(&"del:4".to_string()));
        assert!(!data.contains(&"edit:4".to_string()));
        assert!(data.contains(&"back".to_string()));
    }

    #[tokio::test]
    async fn large_bundle_is_split_into_albums() {
        let fake = FakeMessenger::default();
        let mut listing = sample(4, 1, "Todo");
        listing
            .apply(
                FieldEdit::Category(crate::catalog::Category::MovingKit),
                t0(),
            )
            .unwrap();
        let extra: Vec<_> = (0..9).map(|i| PhotoRef(format!("x{i}"))).collect();
        listing
            .apply(FieldEdit::AdditionalPhotos(extra), t0())
            .unwrap();
        deliver(
            &fake,
            ChatId(1),
            None,
            vec![Reply::card(listing, CardContext::Updated)],
        )
        .await
        .unwrap();
        let albums: Vec<_> = fake
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Album(p, caption) => Some((p.len(), caption.is_empty())),
                _ => None,
            })
            .collect();
        assert_eq!(albums, vec![(10, false)]);
    }

    #[tokio::test]
    async fn result_page_lists_entries_and_navigation() {
        let fake = FakeMessenger::default();
        let page = ResultPage {
            entries: vec![sample(7, 1, "Silla"), sample(8, 1, "Mesa")],
            first_index: 5,
            total: 7,
            page: 1,
            page_count: 2,
        };
        deliver(&fake, ChatId(1), None, vec![Reply::ResultList(page)])
            .await
            .unwrap();
        let calls = fake.calls();
        let Call::Keyboard(text, kb) = &calls[0] else {
            panic!("expected keyboard");
        };
        assert!(text.contains("Página 2 de 2"));
        assert_eq!(
            callbacks(kb),
            vec!["open:5", "open:6", "page:prev", "cancel"]
        );
        assert_eq!(kb.rows[0][0].label, "#7 Silla (10.00)");
    }
}

//! Conversation state machine.
//!
//! `Marketplace::handle` maps `(session, input)` to `(session', replies)`, mutating
//! the `Store` only at commit steps. Each user's session is locked for the whole
//! handling of one event; different users proceed concurrently.

pub mod action;
mod admin;
mod browse;
mod create;
mod edit;
mod manage;
pub mod prompts;
pub mod reply;
pub mod session;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    clock::Clock,
    config::Config,
    domain::{ChatId, GeoPoint, PhotoRef, UserId},
    errors::Error,
    store::Store,
};

pub use action::{Action, EditField};
pub use reply::{CardContext, Menu, MenuOption, Reply, ResultPage};
pub use session::Session;

use session::SessionTable;

/// Typed user input, decoded once by the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Text(String),
    Photo(PhotoRef),
    Location(GeoPoint),
    Action(Action),
}

#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub user: UserId,
    pub chat: ChatId,
    pub username: Option<String>,
    pub is_bot: bool,
    pub input: Input,
}

/// Per-event facts every handler needs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Ctx {
    pub user: UserId,
    pub is_admin: bool,
    pub banned: bool,
    pub now: DateTime<Utc>,
}

/// Next session plus what to show.
pub(crate) type Outcome = (Session, Vec<Reply>);

pub struct Marketplace {
    cfg: Arc<Config>,
    store: Arc<Store>,
    sessions: SessionTable,
    clock: Arc<dyn Clock>,
}

impl Marketplace {
    pub fn new(cfg: Arc<Config>, store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cfg,
            store,
            sessions: SessionTable::default(),
            clock,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn session(&self, user: UserId) -> Session {
        self.sessions.get(user).await
    }

    pub async fn handle(&self, event: InboundEvent) -> Vec<Reply> {
        if event.is_bot {
            tracing::warn!(user = %event.user, "ignoring event from bot account");
            return Vec::new();
        }

        let mut session = self.sessions.lock(event.user).await;
        let profile = self.store.register(event.user).await;
        let ctx = Ctx {
            user: event.user,
            is_admin: self.cfg.is_admin(event.user),
            banned: profile.banned,
            now: self.clock.now(),
        };

        let current = std::mem::take(&mut *session);
        let from = current.name();
        let (next, replies) = self.dispatch(ctx, current, event.input).await;
        tracing::debug!(
            user = %event.user,
            username = event.username.as_deref().unwrap_or(""),
            from,
            to = next.name(),
            replies = replies.len(),
            "event handled"
        );
        *session = next;
        replies
    }

    async fn dispatch(&self, ctx: Ctx, session: Session, input: Input) -> Outcome {
        if let Input::Action(action) = &input {
            let action = *action;

            if action == Action::Cancel {
                return (Session::Idle, vec![Reply::prompt(prompts::CANCELLED, Menu::main())]);
            }
            if ctx.banned && (action.starts_flow() || session.is_idle()) {
                tracing::info!(user = %ctx.user, %action, "refused action from banned user");
                return (session, vec![Reply::notice(prompts::BANNED)]);
            }
            if action.starts_flow() {
                tracing::info!(user = %ctx.user, %action, from = session.name(), "flow start");
            }

            match action {
                Action::Start => {
                    return (Session::Idle, vec![Reply::prompt(prompts::WELCOME, Menu::main())])
                }
                Action::NewListing => return self.start_create(),
                Action::Search => return self.start_search(),
                Action::MyListings => return self.my_listings(ctx).await,
                Action::View(id) => return self.view_own(ctx, id).await,
                Action::Edit(id) => return self.start_edit(ctx, id).await,
                Action::Delete(id) => return self.ask_delete(ctx, id).await,
                Action::Admin if !ctx.is_admin => {
                    tracing::warn!(user = %ctx.user, "non-admin asked for /admin");
                    return (session, vec![Reply::notice(prompts::NOT_AUTHORIZED)]);
                }
                Action::Admin => return self.start_admin(),
                _ => {}
            }
        } else if ctx.banned && session.is_idle() {
            return (session, vec![Reply::notice(prompts::BANNED)]);
        }

        match session {
            Session::Idle => idle(input),
            Session::Create { step, draft } => self.create_step(ctx, step, draft, input).await,
            Session::Edit { listing, step } => self.edit_step(ctx, listing, step, input).await,
            Session::ConfirmDelete { listing } => self.confirm_delete(ctx, listing, input).await,
            Session::Search { step, query } => self.search_step(ctx, step, query, input).await,
            Session::Results { cursor } => self.results_step(ctx, cursor, input).await,
            Session::Admin { step } => self.admin_step(ctx, step, input).await,
        }
    }

    /// Leave the flow after a store-level failure.
    fn abort(&self, ctx: Ctx, err: Error) -> Outcome {
        let text = match &err {
            Error::NotFound(_) | Error::Forbidden { .. } => {
                tracing::warn!(user = %ctx.user, error = %err, "flow aborted");
                prompts::NOT_FOUND_OR_FORBIDDEN.to_string()
            }
            Error::Banned(_) => prompts::BANNED.to_string(),
            Error::Validation(e) => format!("❗ {}", prompts::validation(e)),
            _ => {
                tracing::error!(user = %ctx.user, error = %err, "flow failed");
                "❗ Ocurrió un error. Intente de nuevo.".to_string()
            }
        };
        (Session::Idle, vec![Reply::prompt(text, Menu::main())])
    }
}

fn idle(input: Input) -> Outcome {
    let reply = match input {
        Input::Action(
            Action::Open(_)
            | Action::PrevItem
            | Action::NextItem
            | Action::PrevPage
            | Action::NextPage
            | Action::BackToResults,
        ) => Reply::notice(prompts::SEARCH_EXPIRED),
        Input::Action(_) => Reply::notice(prompts::STALE_ACTION),
        Input::Text(_) | Input::Photo(_) | Input::Location(_) => {
            Reply::prompt(prompts::UNKNOWN_COMMAND, Menu::main())
        }
    };
    (Session::Idle, vec![reply])
}

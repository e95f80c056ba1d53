use crate::{domain::UserId, errors::ValidationError};

use super::{
    prompts,
    reply::{Menu, MenuOption, Reply},
    session::{AdminStep, Session},
    Action, Ctx, Input, Marketplace, Outcome,
};

fn admin_menu() -> Menu {
    Menu::none()
        .row(vec![
            MenuOption::new("🚫 Bloquear usuario", Action::Ban),
            MenuOption::new("✅ Desbloquear usuario", Action::Unban),
        ])
        .cancel()
}

impl Marketplace {
    /// Callers have already checked `ctx.is_admin`.
    pub(super) fn start_admin(&self) -> Outcome {
        (
            Session::Admin {
                step: AdminStep::ChooseAction,
            },
            vec![Reply::prompt(prompts::ADMIN_MENU, admin_menu())],
        )
    }

    pub(super) async fn admin_step(&self, ctx: Ctx, step: AdminStep, input: Input) -> Outcome {
        if !ctx.is_admin {
            return (Session::Idle, vec![Reply::notice(prompts::NOT_AUTHORIZED)]);
        }

        match (step, input) {
            (AdminStep::ChooseAction, Input::Action(a @ (Action::Ban | Action::Unban))) => (
                Session::Admin {
                    step: AdminStep::EnterUserId {
                        ban: a == Action::Ban,
                    },
                },
                vec![Reply::prompt(prompts::ASK_USER_ID, Menu::none().cancel())],
            ),
            (AdminStep::EnterUserId { ban }, Input::Text(t)) => match t.trim().parse::<i64>() {
                Ok(raw) if !(ban && UserId(raw) == ctx.user) => {
                    let target = UserId(raw);
                    self.store.set_banned(target, ban).await;
                    tracing::info!(admin = %ctx.user, user = %target, ban, "ban flag changed by admin");
                    (
                        Session::Idle,
                        vec![Reply::prompt(prompts::user_banned(target, ban), Menu::main())],
                    )
                }
                _ => (
                    Session::Admin { step },
                    vec![Reply::rejected(
                        &ValidationError::UnexpectedInput,
                        prompts::ASK_USER_ID,
                        Menu::none().cancel(),
                    )],
                ),
            },
            (step, _) => {
                let (text, menu) = match step {
                    AdminStep::ChooseAction => (prompts::ADMIN_MENU, admin_menu()),
                    AdminStep::EnterUserId { .. } => (prompts::ASK_USER_ID, Menu::none().cancel()),
                };
                (
                    Session::Admin { step },
                    vec![Reply::rejected(&ValidationError::UnexpectedInput, text, menu)],
                )
            }
        }
    }
}

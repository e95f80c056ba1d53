//! "Mis anuncios" and the two-phase delete.

use crate::{
    domain::ListingId,
    errors::{Error, ValidationError},
    formatting::entry_label,
};

use super::{
    prompts,
    reply::{CardContext, Menu, MenuOption, Reply},
    session::Session,
    Action, Ctx, Input, Marketplace, Outcome,
};

impl Marketplace {
    pub(super) async fn my_listings(&self, ctx: Ctx) -> Outcome {
        let listings = self.store.active_listings_of(ctx.user, ctx.now).await;
        if listings.is_empty() {
            return (
                Session::Idle,
                vec![Reply::prompt(prompts::NO_OWN_LISTINGS, Menu::main())],
            );
        }

        let mut menu = Menu::none();
        for listing in &listings {
            menu = menu.row(vec![
                MenuOption::new(entry_label(listing), Action::View(listing.id)),
                MenuOption::new("🗑", Action::Delete(listing.id)),
            ]);
        }
        (
            Session::Idle,
            vec![Reply::prompt(prompts::PICK_OWN_LISTING, menu.cancel())],
        )
    }

    pub(super) async fn view_own(&self, ctx: Ctx, id: ListingId) -> Outcome {
        match self.store.get(id).await {
            Some(listing) if listing.owner == ctx.user => {
                (Session::Idle, vec![Reply::card(listing, CardContext::Owner)])
            }
            Some(_) => self.abort(
                ctx,
                Error::Forbidden {
                    user: ctx.user,
                    listing: id,
                },
            ),
            None => self.abort(ctx, Error::NotFound(id)),
        }
    }

    /// First phase: the owner (or the administrator) is asked to confirm.
    pub(super) async fn ask_delete(&self, ctx: Ctx, id: ListingId) -> Outcome {
        match self.store.get(id).await {
            Some(listing) if listing.owner == ctx.user || ctx.is_admin => {
                let text = prompts::confirm_delete(id, &listing.title);
                (
                    Session::ConfirmDelete { listing: id },
                    vec![Reply::prompt(text, Menu::confirm_delete(id))],
                )
            }
            Some(_) => self.abort(
                ctx,
                Error::Forbidden {
                    user: ctx.user,
                    listing: id,
                },
            ),
            None => self.abort(ctx, Error::NotFound(id)),
        }
    }

    /// Second phase. Only the matching confirm action deletes.
    pub(super) async fn confirm_delete(&self, ctx: Ctx, id: ListingId, input: Input) -> Outcome {
        match input {
            Input::Action(Action::ConfirmDelete(confirmed)) if confirmed == id => {
                match self.store.delete(ctx.user, id, ctx.is_admin).await {
                    Ok(_) => (
                        Session::Idle,
                        vec![Reply::prompt(prompts::deleted(id), Menu::main())],
                    ),
                    Err(e) => self.abort(ctx, e),
                }
            }
            _ => {
                let title = self
                    .store
                    .get(id)
                    .await
                    .map(|l| l.title)
                    .unwrap_or_default();
                (
                    Session::ConfirmDelete { listing: id },
                    vec![Reply::rejected(
                        &ValidationError::UnexpectedInput,
                        prompts::confirm_delete(id, &title),
                        Menu::confirm_delete(id),
                    )],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{act, card, harness, has_notice, text, ADMIN};
    use super::*;
    use crate::{catalog::City, domain::UserId};

    #[tokio::test]
    async fn my_listings_shows_only_active_own_listings() {
        let h = harness();
        let a = h.create(1, "Silla", "10", City::Quito).await;
        h.create(2, "Mesa", "10", City::Quito).await;

        let replies = h.send(1, act(Action::MyListings)).await;
        let Reply::Prompt { menu, .. } = &replies[0] else {
            panic!("expected a prompt");
        };
        let views: Vec<_> = menu
            .actions()
            .filter(|a| matches!(a, Action::View(_)))
            .collect();
        assert_eq!(views, vec![Action::View(a)]);

        h.clock.advance(chrono::Duration::days(4));
        let replies = h.send(1, act(Action::MyListings)).await;
        assert!(has_notice(&replies, "No tienes anuncios activos"));
    }

    #[tokio::test]
    async fn owner_views_own_card() {
        let h = harness();
        let id = h.create(1, "Silla", "10", City::Quito).await;
        let replies = h.send(1, act(Action::View(id))).await;
        assert_eq!(card(&replies).unwrap().1, CardContext::Owner);

        let replies = h.send(2, act(Action::View(id))).await;
        assert!(card(&replies).is_none());
    }

    #[tokio::test]
    async fn delete_needs_explicit_confirmation() {
        let h = harness();
        let id = h.create(1, "Silla", "10", City::Quito).await;

        h.send(1, act(Action::Delete(id))).await;
        assert_eq!(h.session(1).await, Session::ConfirmDelete { listing: id });

        // Anything but the confirm action keeps the listing.
        h.send(1, text("sí")).await;
        assert_eq!(h.session(1).await, Session::ConfirmDelete { listing: id });
        h.send(1, act(Action::Cancel)).await;
        assert!(h.listing(id).await.is_some());
        assert!(h.session(1).await.is_idle());

        h.send(1, act(Action::Delete(id))).await;
        let replies = h.send(1, act(Action::ConfirmDelete(id))).await;
        assert!(has_notice(&replies, "eliminado"));
        assert!(h.listing(id).await.is_none());
        let user = h.market.store().user(UserId(1)).await.unwrap();
        assert!(user.listing_ids.is_empty());
    }

    #[tokio::test]
    async fn other_users_cannot_delete() {
        let h = harness();
        let id = h.create(1, "Silla", "10", City::Quito).await;

        let replies = h.send(2, act(Action::Delete(id))).await;
        assert!(has_notice(&replies, "no le pertenece"));
        assert!(h.session(2).await.is_idle());

        // A forged confirm without the first phase does nothing either.
        let replies = h.send(2, act(Action::ConfirmDelete(id))).await;
        assert!(has_notice(&replies, "ya no está disponible"));
        assert!(h.listing(id).await.is_some());
    }

    #[tokio::test]
    async fn admin_may_delete_any_listing() {
        let h = harness();
        let id = h.create(1, "Silla", "10", City::Quito).await;
        h.send(ADMIN, act(Action::Delete(id))).await;
        h.send(ADMIN, act(Action::ConfirmDelete(id))).await;
        assert!(h.listing(id).await.is_none());
        let user = h.market.store().user(UserId(1)).await.unwrap();
        assert!(user.listing_ids.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_already_deleted_listing_aborts() {
        let h = harness();
        let id = h.create(1, "Silla", "10", City::Quito).await;
        h.send(1, act(Action::Delete(id))).await;
        h.market.store().delete(UserId(1), id, false).await.unwrap();

        let replies = h.send(1, act(Action::ConfirmDelete(id))).await;
        assert!(has_notice(&replies, "no encontrado"));
        assert!(h.session(1).await.is_idle());
    }
}

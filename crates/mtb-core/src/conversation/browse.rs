//! Search wizard and result browsing.

use std::collections::HashMap;

use crate::{
    catalog::{Category, City},
    domain::ListingId,
    errors::ValidationError,
    listing::Listing,
    search::{CategoryFilter, ResultCursor, SearchQuery, Step},
};

use super::{
    prompts,
    reply::{CardContext, Menu, Reply, ResultPage},
    session::{SearchStep, Session},
    Action, Ctx, Input, Marketplace, Outcome,
};

impl Marketplace {
    pub(super) fn start_search(&self) -> Outcome {
        (
            Session::Search {
                step: SearchStep::Keyword,
                query: SearchQuery::default(),
            },
            vec![Reply::prompt(
                prompts::ASK_KEYWORD,
                Menu::none().skip().cancel(),
            )],
        )
    }

    async fn search_prompt(&self, ctx: Ctx, step: SearchStep) -> (String, Menu) {
        match step {
            SearchStep::Keyword => (prompts::ASK_KEYWORD.into(), Menu::none().skip().cancel()),
            SearchStep::Category => {
                let occ = self.store.occupancy(ctx.now).await;
                (prompts::ASK_SEARCH_CATEGORY.into(), Menu::search_categories(&occ))
            }
            SearchStep::City => {
                let occ = self.store.occupancy(ctx.now).await;
                (prompts::ASK_SEARCH_CITY.into(), Menu::search_cities(&occ))
            }
        }
    }

    pub(super) async fn search_step(
        &self,
        ctx: Ctx,
        step: SearchStep,
        mut query: SearchQuery,
        input: Input,
    ) -> Outcome {
        let next = match accept_search(step, &mut query, input) {
            Ok(next) => next,
            Err(err) => {
                let (text, menu) = self.search_prompt(ctx, step).await;
                return (
                    Session::Search { step, query },
                    vec![Reply::rejected(&err, text, menu)],
                );
            }
        };

        match next {
            Some(next) => {
                let (text, menu) = self.search_prompt(ctx, next).await;
                (
                    Session::Search { step: next, query },
                    vec![Reply::prompt(text, menu)],
                )
            }
            None => self.run_search(ctx, query).await,
        }
    }

    async fn run_search(&self, ctx: Ctx, query: SearchQuery) -> Outcome {
        let ids = self.store.search(&query, ctx.now).await;
        tracing::info!(
            user = %ctx.user,
            keyword = %query.keyword,
            category = ?query.category,
            city = ?query.city,
            hits = ids.len(),
            "search"
        );
        if ids.is_empty() {
            return (
                Session::Idle,
                vec![Reply::prompt(prompts::NO_RESULTS, Menu::main())],
            );
        }

        let mut cursor = ResultCursor::new(ids);
        let page = self.result_page(ctx, &mut cursor).await;
        (Session::Results { cursor }, vec![Reply::ResultList(page)])
    }

    /// Current page of results. Listings deleted or expired since the search are
    /// dropped from the cursor first, so entry positions match `Open` indices.
    async fn result_page(&self, ctx: Ctx, cursor: &mut ResultCursor) -> ResultPage {
        let mut live: HashMap<ListingId, Listing> = self
            .store
            .get_many(cursor.ids())
            .await
            .into_iter()
            .filter(|l| l.is_active(ctx.now))
            .map(|l| (l.id, l))
            .collect();
        cursor.retain(|id| live.contains_key(&id));

        ResultPage {
            entries: cursor
                .page_ids()
                .iter()
                .filter_map(|id| live.remove(id))
                .collect(),
            first_index: cursor.page_start(),
            total: cursor.total(),
            page: cursor.page(),
            page_count: cursor.page_count(),
        }
    }

    pub(super) async fn results_step(
        &self,
        ctx: Ctx,
        mut cursor: ResultCursor,
        input: Input,
    ) -> Outcome {
        let action = match input {
            Input::Action(action) => action,
            _ => {
                let page = self.result_page(ctx, &mut cursor).await;
                return (
                    Session::Results { cursor },
                    vec![
                        Reply::notice(prompts::UNKNOWN_COMMAND),
                        Reply::ResultList(page),
                    ],
                );
            }
        };

        let replies = match action {
            Action::Open(index) => match cursor.open(index) {
                Some(id) => self.show_result(ctx, &mut cursor, id).await,
                None => vec![Reply::notice(prompts::STALE_ACTION)],
            },
            Action::NextItem | Action::PrevItem => {
                let step = if action == Action::NextItem {
                    cursor.next_item()
                } else {
                    cursor.prev_item()
                };
                match (step, cursor.current()) {
                    (Step::Moved, Some((_, id))) => self.show_result(ctx, &mut cursor, id).await,
                    (Step::AtEnd, Some(_)) => vec![Reply::notice(prompts::LAST_ITEM)],
                    (Step::AtStart, Some(_)) => vec![Reply::notice(prompts::FIRST_ITEM)],
                    (_, None) => vec![Reply::notice(prompts::STALE_ACTION)],
                }
            }
            Action::NextPage => match cursor.next_page() {
                Step::Moved => vec![Reply::ResultList(self.result_page(ctx, &mut cursor).await)],
                _ => vec![Reply::notice(prompts::NO_MORE_RESULTS)],
            },
            Action::PrevPage => match cursor.prev_page() {
                Step::Moved => vec![Reply::ResultList(self.result_page(ctx, &mut cursor).await)],
                _ => vec![Reply::notice(prompts::FIRST_PAGE)],
            },
            Action::BackToResults => vec![Reply::ResultList(self.result_page(ctx, &mut cursor).await)],
            _ => vec![Reply::notice(prompts::STALE_ACTION)],
        };
        if cursor.is_empty() {
            return (
                Session::Idle,
                vec![Reply::prompt(prompts::NO_RESULTS, Menu::main())],
            );
        }
        (Session::Results { cursor }, replies)
    }

    /// Card for the opened result; drops it from the list if it vanished meanwhile.
    async fn show_result(&self, ctx: Ctx, cursor: &mut ResultCursor, id: ListingId) -> Vec<Reply> {
        let listing = self
            .store
            .get(id)
            .await
            .filter(|l| l.is_active(ctx.now));
        let Some(listing) = listing else {
            cursor.remove(id);
            return vec![
                Reply::notice(prompts::LISTING_GONE),
                Reply::ResultList(self.result_page(ctx, cursor).await),
            ];
        };

        let Some((index, _)) = cursor.current() else {
            return vec![Reply::notice(prompts::STALE_ACTION)];
        };
        let owner = listing.owner == ctx.user;
        let context = CardContext::SearchResult {
            index,
            total: cursor.total(),
            deletable: owner || ctx.is_admin,
            editable: owner,
        };
        vec![Reply::card(listing, context)]
    }
}

/// `Ok(None)` means the wizard is complete.
fn accept_search(
    step: SearchStep,
    query: &mut SearchQuery,
    input: Input,
) -> Result<Option<SearchStep>, ValidationError> {
    use Action as A;

    let next = match (step, input) {
        (SearchStep::Keyword, Input::Text(t)) => {
            query.keyword = t.trim().to_string();
            Some(SearchStep::Category)
        }
        (SearchStep::Keyword, Input::Action(A::Skip)) => {
            query.keyword.clear();
            Some(SearchStep::Category)
        }

        (SearchStep::Category, Input::Action(A::Category(c))) => {
            query.category = CategoryFilter::Category(c);
            Some(SearchStep::City)
        }
        (SearchStep::Category, Input::Action(A::Free)) => {
            query.category = CategoryFilter::FreeOnly;
            Some(SearchStep::City)
        }
        (SearchStep::Category, Input::Action(A::Skip)) => {
            query.category = CategoryFilter::Any;
            Some(SearchStep::City)
        }
        (SearchStep::Category, Input::Text(t)) => {
            let c = Category::parse(&t).ok_or(ValidationError::UnknownCategory(t))?;
            query.category = CategoryFilter::Category(c);
            Some(SearchStep::City)
        }

        (SearchStep::City, Input::Action(A::City(c))) => {
            query.city = Some(c);
            None
        }
        (SearchStep::City, Input::Text(t)) => {
            query.city = Some(City::parse(&t).ok_or(ValidationError::UnknownCity(t))?);
            None
        }
        (SearchStep::City, Input::Action(A::Skip)) => {
            query.city = None;
            None
        }

        _ => return Err(ValidationError::UnexpectedInput),
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{act, card, harness, has_notice, text, Harness, ADMIN};
    use super::*;
    use crate::search::PAGE_SIZE;

    async fn search(h: &Harness, user: i64, keyword: Option<&str>, city: Option<City>) -> Vec<Reply> {
        h.send(user, act(Action::Search)).await;
        match keyword {
            Some(k) => h.send(user, text(k)).await,
            None => h.send(user, act(Action::Skip)).await,
        };
        h.send(user, act(Action::Skip)).await;
        match city {
            Some(c) => h.send(user, act(Action::City(c))).await,
            None => h.send(user, act(Action::Skip)).await,
        }
    }

    fn page(replies: &[Reply]) -> &ResultPage {
        replies
            .iter()
            .find_map(|r| match r {
                Reply::ResultList(p) => Some(p),
                _ => None,
            })
            .expect("result page")
    }

    #[tokio::test]
    async fn conjunctive_search_through_the_wizard() {
        let h = harness();
        let red = h.create(1, "Silla roja", "10", City::Quito).await;
        h.create(1, "Silla azul", "10", City::Cuenca).await;

        let replies = search(&h, 2, Some("silla"), Some(City::Quito)).await;
        let p = page(&replies);
        assert_eq!(p.total, 1);
        assert_eq!(p.entries[0].id, red);

        let replies = search(&h, 2, Some("roja"), Some(City::Cuenca)).await;
        assert!(has_notice(&replies, "No se encontraron"));
    }

    #[tokio::test]
    async fn free_only_filter_and_free_first_order() {
        let h = harness();
        let paid = h.create(1, "Lámpara", "15", City::Quito).await;
        let free = h.create(1, "Lámpara vieja", "gratis", City::Quito).await;

        let replies = search(&h, 2, Some("lámpara"), None).await;
        let ids: Vec<_> = page(&replies).entries.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![free, paid]);

        h.send(2, act(Action::Search)).await;
        h.send(2, act(Action::Skip)).await;
        let replies = h.send(2, act(Action::Free)).await;
        assert!(matches!(replies[0], Reply::Prompt { .. }));
        let replies = h.send(2, act(Action::Skip)).await;
        let p = page(&replies);
        assert_eq!(p.total, 1);
        assert!(p.entries[0].is_free());
    }

    #[tokio::test]
    async fn category_menu_carries_counts() {
        let h = harness();
        h.create(1, "Silla", "gratis", City::Quito).await;
        h.send(2, act(Action::Search)).await;
        let replies = h.send(2, act(Action::Skip)).await;
        let Reply::Prompt { menu, .. } = &replies[0] else {
            panic!("expected category prompt");
        };
        let labels: Vec<_> = menu.rows.iter().flatten().map(|o| o.label.clone()).collect();
        assert!(labels.contains(&"♾ Solo Gratis (1)".to_string()));
        assert!(labels.contains(&"🛋️ Muebles (1)".to_string()));
    }

    #[tokio::test]
    async fn page_navigation_clamps_with_notice() {
        let h = harness();
        for i in 0..7 {
            h.create(1, &format!("Libro {i}"), "3", City::Loja).await;
        }
        let replies = search(&h, 2, Some("libro"), None).await;
        let p = page(&replies);
        assert_eq!((p.total, p.page_count, p.entries.len()), (7, 2, PAGE_SIZE));
        assert!(!p.has_prev() && p.has_next());

        let replies = h.send(2, act(Action::PrevPage)).await;
        assert_eq!(replies, vec![Reply::notice(prompts::FIRST_PAGE)]);

        let replies = h.send(2, act(Action::NextPage)).await;
        assert_eq!(page(&replies).entries.len(), 2);
        assert_eq!(page(&replies).first_index, 5);

        let replies = h.send(2, act(Action::NextPage)).await;
        assert_eq!(replies, vec![Reply::notice(prompts::NO_MORE_RESULTS)]);
        let Session::Results { cursor } = h.session(2).await else {
            panic!("still browsing");
        };
        assert_eq!(cursor.page(), 1);
    }

    #[tokio::test]
    async fn item_stepping_clamps_with_notice() {
        let h = harness();
        let a = h.create(1, "Mesa A", "3", City::Loja).await;
        let b = h.create(1, "Mesa B", "3", City::Loja).await;
        search(&h, 2, Some("mesa"), None).await;

        let replies = h.send(2, act(Action::Open(0))).await;
        let (listing, context) = card(&replies).unwrap();
        assert_eq!(listing.id, a);
        assert_eq!(
            context,
            CardContext::SearchResult {
                index: 0,
                total: 2,
                deletable: false,
                editable: false
            }
        );

        let replies = h.send(2, act(Action::PrevItem)).await;
        assert_eq!(replies, vec![Reply::notice(prompts::FIRST_ITEM)]);

        let replies = h.send(2, act(Action::NextItem)).await;
        assert_eq!(card(&replies).unwrap().0.id, b);
        let replies = h.send(2, act(Action::NextItem)).await;
        assert_eq!(replies, vec![Reply::notice(prompts::LAST_ITEM)]);

        let replies = h.send(2, act(Action::BackToResults)).await;
        assert_eq!(page(&replies).total, 2);
    }

    #[tokio::test]
    async fn admin_sees_delete_on_foreign_results() {
        let h = harness();
        h.create(1, "Mesa", "3", City::Loja).await;
        search(&h, ADMIN, None, None).await;
        let replies = h.send(ADMIN, act(Action::Open(0))).await;
        let (_, context) = card(&replies).unwrap();
        assert!(matches!(
            context,
            CardContext::SearchResult {
                deletable: true,
                editable: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn vanished_result_is_dropped_from_list() {
        let h = harness();
        let a = h.create(1, "Mesa A", "3", City::Loja).await;
        h.create(1, "Mesa B", "3", City::Loja).await;
        search(&h, 2, Some("mesa"), None).await;
        h.market
            .store()
            .delete(crate::domain::UserId(1), a, false)
            .await
            .unwrap();

        let replies = h.send(2, act(Action::Open(0))).await;
        assert!(has_notice(&replies, "ya no está disponible"));
        assert_eq!(page(&replies).total, 1);
    }

    #[tokio::test]
    async fn list_indices_follow_deletions_elsewhere() {
        let h = harness();
        let a = h.create(1, "Mesa A", "3", City::Loja).await;
        let b = h.create(1, "Mesa B", "3", City::Loja).await;
        let c = h.create(1, "Mesa C", "3", City::Loja).await;
        search(&h, 2, Some("mesa"), None).await;
        h.market
            .store()
            .delete(crate::domain::UserId(1), a, false)
            .await
            .unwrap();

        let replies = h.send(2, act(Action::BackToResults)).await;
        let listed = page(&replies);
        assert_eq!(listed.total, 2);
        assert_eq!(listed.first_index, 0);
        let shown: Vec<ListingId> = listed.entries.iter().map(|l| l.id).collect();
        assert_eq!(shown, vec![b, c]);

        let replies = h.send(2, act(Action::Open(1))).await;
        let (opened, _) = card(&replies).unwrap();
        assert_eq!(opened.id, c);
    }

    #[tokio::test]
    async fn list_with_every_result_gone_ends_browsing() {
        let h = harness();
        let a = h.create(1, "Mesa A", "3", City::Loja).await;
        search(&h, 2, Some("mesa"), None).await;
        h.market
            .store()
            .delete(crate::domain::UserId(1), a, false)
            .await
            .unwrap();

        let replies = h.send(2, act(Action::BackToResults)).await;
        assert!(has_notice(&replies, "No se encontraron resultados"));
        assert!(h.session(2).await.is_idle());
    }
}

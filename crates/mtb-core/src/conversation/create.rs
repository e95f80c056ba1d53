use crate::{
    catalog::{Category, City},
    errors::ValidationError,
    listing::{validate_contact, validate_description, validate_title, Price, Vigency},
};

use super::{
    prompts,
    reply::{CardContext, Menu, Reply},
    session::{CreateDraft, CreateStep, Session},
    Action, Ctx, Input, Marketplace, Outcome,
};

/// What an accepted create-flow input leads to.
enum Next {
    Step(CreateStep),
    /// Same step, with a progress prompt instead of the step prompt.
    Stay(Reply),
    Commit(Vigency),
}

impl Marketplace {
    pub(super) fn start_create(&self) -> Outcome {
        let draft = CreateDraft::default();
        let (text, menu) = self.create_prompt(CreateStep::Category, &draft);
        let session = Session::Create {
            step: CreateStep::Category,
            draft,
        };
        (session, vec![Reply::prompt(text, menu)])
    }

    fn create_prompt(&self, step: CreateStep, draft: &CreateDraft) -> (String, Menu) {
        match step {
            CreateStep::Category => (prompts::ASK_CATEGORY.into(), Menu::categories()),
            CreateStep::Title => (prompts::ask_title(), Menu::none().cancel()),
            CreateStep::Description => (prompts::ASK_DESCRIPTION.into(), Menu::none().skip().cancel()),
            CreateStep::PrimaryPhoto => (prompts::ASK_PRIMARY_PHOTO.into(), Menu::none().cancel()),
            CreateStep::AdditionalPhotos => (
                prompts::ask_additional_photos(draft.photo_cap()),
                Menu::photos_done(),
            ),
            CreateStep::Price => (prompts::ASK_PRICE.into(), Menu::price()),
            CreateStep::City => (prompts::ASK_CITY.into(), Menu::cities().skip().cancel()),
            CreateStep::LocationKind => (
                prompts::ASK_LOCATION_KIND.into(),
                Menu::none()
                    .single("🏙️ Solo ciudad", Action::CityOnly)
                    .single("📍 Enviar geolocalización", Action::Geolocation)
                    .cancel(),
            ),
            CreateStep::Geolocation => {
                let menu = if draft.city.is_some() {
                    Menu::none().skip().cancel()
                } else {
                    Menu::none().cancel()
                };
                (prompts::ASK_GEOLOCATION.into(), menu)
            }
            CreateStep::Contact => (prompts::ASK_CONTACT.into(), Menu::none().cancel()),
            CreateStep::Vigency => (
                prompts::ASK_VIGENCY.into(),
                Menu::vigency(self.cfg.allow_no_expiry),
            ),
        }
    }

    pub(super) async fn create_step(
        &self,
        ctx: Ctx,
        step: CreateStep,
        mut draft: CreateDraft,
        input: Input,
    ) -> Outcome {
        match self.accept(step, &mut draft, input) {
            Ok(Next::Step(next)) => {
                let (text, menu) = self.create_prompt(next, &draft);
                let session = Session::Create { step: next, draft };
                (session, vec![Reply::prompt(text, menu)])
            }
            Ok(Next::Stay(reply)) => (Session::Create { step, draft }, vec![reply]),
            Ok(Next::Commit(vigency)) => self.commit_create(ctx, draft, vigency).await,
            Err(err) => {
                tracing::debug!(user = %ctx.user, ?step, error = %err, "create input refused");
                let (text, menu) = self.create_prompt(step, &draft);
                let session = Session::Create { step, draft };
                (session, vec![Reply::rejected(&err, text, menu)])
            }
        }
    }

    /// Validate one input against the current step. The draft only changes on `Ok`.
    fn accept(
        &self,
        step: CreateStep,
        draft: &mut CreateDraft,
        input: Input,
    ) -> Result<Next, ValidationError> {
        use Action as A;
        use CreateStep as S;

        let next = match (step, input) {
            (S::Category, Input::Action(A::Category(c))) => {
                draft.category = Some(c);
                S::Title
            }
            (S::Category, Input::Text(t)) => {
                draft.category =
                    Some(Category::parse(&t).ok_or(ValidationError::UnknownCategory(t))?);
                S::Title
            }

            (S::Title, Input::Text(t)) => {
                draft.title = Some(validate_title(&t)?);
                S::Description
            }

            (S::Description, Input::Text(t)) => {
                draft.description = Some(validate_description(&t)?);
                S::PrimaryPhoto
            }
            (S::Description, Input::Action(A::Skip)) => {
                draft.description = None;
                S::PrimaryPhoto
            }

            (S::PrimaryPhoto, Input::Photo(p)) => {
                draft.primary_photo = Some(p);
                S::AdditionalPhotos
            }

            (S::AdditionalPhotos, Input::Photo(p)) => {
                draft.push_photo(p)?;
                let (count, max) = (draft.additional_photos.len(), draft.photo_cap());
                if count < max {
                    return Ok(Next::Stay(Reply::prompt(
                        prompts::photo_added(count, max),
                        Menu::photos_done(),
                    )));
                }
                S::Price
            }
            (S::AdditionalPhotos, Input::Action(A::Done)) => S::Price,
            (S::AdditionalPhotos, Input::Action(A::Skip)) => {
                draft.additional_photos.clear();
                S::Price
            }

            (S::Price, Input::Text(t)) => {
                draft.price = Some(Price::parse(&t)?);
                S::City
            }
            (S::Price, Input::Action(A::Free)) => {
                draft.price = Some(Price::Free);
                S::City
            }

            (S::City, Input::Action(A::City(c))) => {
                draft.city = Some(c);
                S::LocationKind
            }
            (S::City, Input::Text(t)) => {
                draft.city = Some(City::parse(&t).ok_or(ValidationError::UnknownCity(t))?);
                S::LocationKind
            }
            (S::City, Input::Action(A::Skip)) => {
                draft.city = None;
                S::Geolocation
            }
            (S::City, Input::Location(point)) => {
                draft.city = None;
                draft.point = Some(point);
                S::Contact
            }

            (S::LocationKind, Input::Action(A::CityOnly)) => {
                draft.point = None;
                S::Contact
            }
            (S::LocationKind, Input::Action(A::Geolocation)) => S::Geolocation,
            (S::LocationKind | S::Geolocation, Input::Location(point)) => {
                draft.point = Some(point);
                S::Contact
            }
            (S::Geolocation, Input::Action(A::Skip)) => {
                if draft.city.is_none() {
                    return Err(ValidationError::LocationRequired);
                }
                draft.point = None;
                S::Contact
            }

            (S::Contact, Input::Text(t)) => {
                draft.contact = Some(validate_contact(&t)?);
                S::Vigency
            }

            (S::Vigency, Input::Action(A::Vigency(v))) => return self.vigency_choice(v),
            (S::Vigency, Input::Text(t)) => {
                let v = Vigency::parse(&t).ok_or(ValidationError::UnexpectedInput)?;
                return self.vigency_choice(v);
            }

            _ => return Err(ValidationError::UnexpectedInput),
        };
        Ok(Next::Step(next))
    }

    fn vigency_choice(&self, vigency: Vigency) -> Result<Next, ValidationError> {
        if vigency == Vigency::NoExpiry && !self.cfg.allow_no_expiry {
            return Err(ValidationError::UnexpectedInput);
        }
        Ok(Next::Commit(vigency))
    }

    async fn commit_create(&self, ctx: Ctx, draft: CreateDraft, vigency: Vigency) -> Outcome {
        let new = match draft.finish(vigency) {
            Ok(new) => new,
            Err(e) => return self.abort(ctx, e.into()),
        };
        match self.store.create(ctx.user, new, ctx.now).await {
            Ok(listing) => (
                Session::Idle,
                vec![
                    Reply::card(listing, CardContext::Created),
                    Reply::prompt(prompts::CREATED, Menu::main()),
                ],
            ),
            Err(e) => self.abort(ctx, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{act, card, harness, has_notice, photo, text};
    use super::*;
    use crate::{
        catalog::City,
        domain::{GeoPoint, PhotoRef},
        listing::Location,
    };

    async fn to_additional_photos(h: &super::super::tests::Harness, user: i64, c: Category) {
        h.send(user, act(Action::NewListing)).await;
        h.send(user, act(Action::Category(c))).await;
        h.send(user, text("Cosas")).await;
        h.send(user, text("varias")).await;
        h.send(user, photo("main")).await;
    }

    fn create_step(s: &Session) -> Option<(CreateStep, &CreateDraft)> {
        match s {
            Session::Create { step, draft } => Some((*step, draft)),
            _ => None,
        }
    }

    #[tokio::test]
    async fn happy_path_with_geolocation_and_photos() {
        let h = harness();
        to_additional_photos(&h, 1, Category::Electronics).await;
        h.send(1, photo("a1")).await;
        h.send(1, photo("a2")).await;
        h.send(1, act(Action::Done)).await;
        h.send(1, text("10,5")).await;
        h.send(1, act(Action::City(City::Cuenca))).await;
        h.send(1, act(Action::Geolocation)).await;
        let point = GeoPoint::new(-2.9, -79.0).unwrap();
        h.send(1, Input::Location(point)).await;
        h.send(1, text("@vendedor")).await;
        let replies = h.send(1, act(Action::Vigency(Vigency::FiveDays))).await;

        let (listing, _) = card(&replies).unwrap();
        assert_eq!(listing.title, "Cosas");
        assert_eq!(listing.description, "varias");
        assert_eq!(
            listing.photos.additional,
            vec![PhotoRef("a1".into()), PhotoRef("a2".into())]
        );
        assert_eq!(listing.price.to_string(), "10.50");
        assert_eq!(
            listing.location,
            Location::CityWithGeo {
                city: City::Cuenca,
                point
            }
        );
        assert_eq!(
            listing.expires_at,
            Some(listing.posted_at + chrono::Duration::days(5))
        );
        assert!(has_notice(&replies, "¡Anuncio creado!"));
        assert!(h.session(1).await.is_idle());

        let user = h.market.store().user(crate::domain::UserId(1)).await.unwrap();
        assert_eq!(user.listing_ids, vec![listing.id]);
    }

    #[tokio::test]
    async fn invalid_input_reprompts_without_changing_state() {
        let h = harness();
        h.send(1, act(Action::NewListing)).await;
        h.send(1, act(Action::Category(Category::Books))).await;

        let before = h.session(1).await;
        let replies = h.send(1, text(&"x".repeat(51))).await;
        assert!(has_notice(&replies, "demasiado largo"));
        assert_eq!(h.session(1).await, before);

        // Wrong kind of input is refused the same way.
        h.send(1, photo("p")).await;
        assert_eq!(h.session(1).await, before);
    }

    #[tokio::test]
    async fn bad_price_is_refused() {
        let h = harness();
        to_additional_photos(&h, 1, Category::Books).await;
        h.send(1, act(Action::Skip)).await;
        let before = h.session(1).await;
        for bad in ["-3", "diez", "1.2.3"] {
            let replies = h.send(1, text(bad)).await;
            assert!(has_notice(&replies, "precio válido"), "{bad}");
            assert_eq!(h.session(1).await, before);
        }
        h.send(1, text("GRATIS")).await;
        let (step, draft) = create_step(&h.session(1).await).map(|(s, d)| (s, d.clone())).unwrap();
        assert_eq!(step, CreateStep::City);
        assert_eq!(draft.price, Some(Price::Free));
    }

    #[tokio::test]
    async fn additional_photo_cap_depends_on_category() {
        let h = harness();
        to_additional_photos(&h, 1, Category::Books).await;
        h.send(1, photo("a1")).await;
        h.send(1, photo("a2")).await;
        // Third photo fills the cap and advances.
        h.send(1, photo("a3")).await;
        let s = h.session(1).await;
        let (step, draft) = create_step(&s).unwrap();
        assert_eq!(step, CreateStep::Price);
        assert_eq!(draft.additional_photos.len(), 3);

        // A late extra photo at the price step is refused, nothing stored.
        let replies = h.send(1, photo("a4")).await;
        assert!(has_notice(&replies, "Entrada no válida"));
        assert_eq!(h.session(1).await, s);

        let h = harness();
        to_additional_photos(&h, 2, Category::MovingKit).await;
        for i in 0..8 {
            h.send(2, photo(&format!("k{i}"))).await;
        }
        let s = h.session(2).await;
        let (step, draft) = create_step(&s).unwrap();
        assert_eq!(step, CreateStep::AdditionalPhotos);
        assert_eq!(draft.additional_photos.len(), 8);
        h.send(2, photo("k8")).await;
        let s = h.session(2).await;
        assert_eq!(create_step(&s).unwrap().0, CreateStep::Price);
    }

    #[tokio::test]
    async fn skipping_photos_clears_accumulated_ones() {
        let h = harness();
        to_additional_photos(&h, 1, Category::Books).await;
        h.send(1, photo("a1")).await;
        h.send(1, act(Action::Skip)).await;
        let s = h.session(1).await;
        assert!(create_step(&s).unwrap().1.additional_photos.is_empty());
    }

    #[tokio::test]
    async fn city_skip_requires_geolocation() {
        let h = harness();
        to_additional_photos(&h, 1, Category::Books).await;
        h.send(1, act(Action::Skip)).await;
        h.send(1, text("5")).await;
        h.send(1, act(Action::Skip)).await;
        assert_eq!(
            create_step(&h.session(1).await).unwrap().0,
            CreateStep::Geolocation
        );

        let replies = h.send(1, act(Action::Skip)).await;
        assert!(has_notice(&replies, "ciudad o una geolocalización"));
        assert_eq!(
            create_step(&h.session(1).await).unwrap().0,
            CreateStep::Geolocation
        );

        let point = GeoPoint::new(0.95, -79.65).unwrap();
        h.send(1, Input::Location(point)).await;
        h.send(1, text("099")).await;
        let replies = h.send(1, text("3 días")).await;
        let (listing, _) = card(&replies).unwrap();
        assert_eq!(listing.location, Location::GeoOnly(point));
    }

    #[tokio::test]
    async fn no_expiry_option_can_be_disabled() {
        let mut h = harness();
        let cfg = crate::config::Config {
            allow_no_expiry: false,
            ..(*h.market.cfg).clone()
        };
        h.market.cfg = std::sync::Arc::new(cfg);

        to_additional_photos(&h, 1, Category::Books).await;
        h.send(1, act(Action::Skip)).await;
        h.send(1, text("5")).await;
        h.send(1, act(Action::City(City::Quito))).await;
        h.send(1, act(Action::CityOnly)).await;
        h.send(1, text("099")).await;
        let replies = h.send(1, act(Action::Vigency(Vigency::NoExpiry))).await;
        assert!(card(&replies).is_none());
        assert!(matches!(h.session(1).await, Session::Create { .. }));
    }
}

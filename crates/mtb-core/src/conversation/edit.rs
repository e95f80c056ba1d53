use crate::{
    catalog::{Category, City},
    domain::{ListingId, PhotoRef},
    errors::{Error, ValidationError},
    listing::{check_additional_photos, FieldEdit, Listing, Price, Vigency},
};

use super::{
    prompts,
    reply::{CardContext, Menu, Reply},
    session::{EditStep, Session},
    Action, Ctx, EditField, Input, Marketplace, Outcome,
};

enum Next {
    Step(EditStep),
    Stay(EditStep, Reply),
    Commit(FieldEdit),
}

impl Marketplace {
    /// Open the field menu for one of the user's own listings.
    pub(super) async fn start_edit(&self, ctx: Ctx, id: ListingId) -> Outcome {
        match self.store.get(id).await {
            Some(listing) if listing.owner == ctx.user => {
                let session = Session::Edit {
                    listing: id,
                    step: EditStep::ChooseField,
                };
                (
                    session,
                    vec![Reply::prompt(prompts::ASK_EDIT_FIELD, Menu::edit_fields())],
                )
            }
            Some(listing) => self.abort(
                ctx,
                Error::Forbidden {
                    user: ctx.user,
                    listing: listing.id,
                },
            ),
            None => self.abort(ctx, Error::NotFound(id)),
        }
    }

    fn edit_prompt(&self, step: &EditStep, listing: &Listing) -> (String, Menu) {
        match step {
            EditStep::ChooseField => (prompts::ASK_EDIT_FIELD.into(), Menu::edit_fields()),
            EditStep::LocationKind => (
                prompts::ASK_EDIT_LOCATION_KIND.into(),
                Menu::none()
                    .single("📍 Mantener ciudad y añadir ubicación", Action::Geolocation)
                    .single("🗺 Solo geolocalización", Action::GeolocationOnly)
                    .cancel(),
            ),
            EditStep::AwaitLocation { .. } => (prompts::ASK_NEW_LOCATION.into(), Menu::none().cancel()),
            EditStep::AdditionalPhotos { .. } => (
                prompts::ask_additional_photos(listing.category.max_additional_photos()),
                Menu::photos_done(),
            ),
            EditStep::Field(field) => match field {
                EditField::Category => ("📋 Seleccione una nueva categoría:".into(), Menu::categories()),
                EditField::Title => (prompts::ask_edit_field(&prompts::ask_title()), Menu::none().cancel()),
                EditField::Price => (prompts::ASK_PRICE.into(), Menu::price()),
                EditField::PrimaryPhoto => ("📸 Envíe una nueva foto principal:".into(), Menu::none().cancel()),
                EditField::Description => (
                    prompts::ask_edit_field(prompts::ASK_DESCRIPTION),
                    Menu::none().skip().cancel(),
                ),
                EditField::City => ("🏙️ Seleccione una nueva ciudad:".into(), Menu::cities().cancel()),
                EditField::Contact => (prompts::ask_edit_field(prompts::ASK_CONTACT), Menu::none().cancel()),
                EditField::Vigency => (
                    "📅 Indique un nuevo período de validez del anuncio:".into(),
                    Menu::vigency(self.cfg.allow_no_expiry),
                ),
                // Routed to their own steps when picked.
                EditField::Location | EditField::AdditionalPhotos => {
                    (prompts::ASK_EDIT_FIELD.into(), Menu::edit_fields())
                }
            },
        }
    }

    pub(super) async fn edit_step(
        &self,
        ctx: Ctx,
        id: ListingId,
        step: EditStep,
        input: Input,
    ) -> Outcome {
        let Some(listing) = self.store.get(id).await else {
            return self.abort(ctx, Error::NotFound(id));
        };

        match self.accept_edit(&listing, step.clone(), input) {
            Ok(Next::Step(next)) => {
                let (text, menu) = self.edit_prompt(&next, &listing);
                let session = Session::Edit {
                    listing: id,
                    step: next,
                };
                (session, vec![Reply::prompt(text, menu)])
            }
            Ok(Next::Stay(next, reply)) => (
                Session::Edit {
                    listing: id,
                    step: next,
                },
                vec![reply],
            ),
            Ok(Next::Commit(edit)) => match self.store.update(ctx.user, id, edit, ctx.now).await {
                Ok(updated) => (
                    Session::Idle,
                    vec![
                        Reply::card(updated, CardContext::Updated),
                        Reply::prompt(prompts::UPDATED, Menu::main()),
                    ],
                ),
                Err(Error::Validation(err)) => self.refuse_edit(ctx, &listing, step, err),
                Err(e) => self.abort(ctx, e),
            },
            Err(err) => self.refuse_edit(ctx, &listing, step, err),
        }
    }

    fn refuse_edit(
        &self,
        ctx: Ctx,
        listing: &Listing,
        step: EditStep,
        err: ValidationError,
    ) -> Outcome {
        tracing::debug!(user = %ctx.user, listing = %listing.id, ?step, error = %err, "edit input refused");
        let (text, menu) = self.edit_prompt(&step, listing);
        let session = Session::Edit {
            listing: listing.id,
            step,
        };
        (session, vec![Reply::rejected(&err, text, menu)])
    }

    fn accept_edit(
        &self,
        listing: &Listing,
        step: EditStep,
        input: Input,
    ) -> Result<Next, ValidationError> {
        use Action as A;

        let edit = match (step, input) {
            (EditStep::ChooseField, Input::Action(A::EditField(field))) => {
                let next = match field {
                    EditField::Location => EditStep::LocationKind,
                    EditField::AdditionalPhotos => EditStep::AdditionalPhotos { photos: Vec::new() },
                    other => EditStep::Field(other),
                };
                return Ok(Next::Step(next));
            }

            (EditStep::LocationKind, Input::Action(A::Geolocation)) => {
                return Ok(Next::Step(EditStep::AwaitLocation { keep_city: true }))
            }
            (EditStep::LocationKind, Input::Action(A::GeolocationOnly)) => {
                return Ok(Next::Step(EditStep::AwaitLocation { keep_city: false }))
            }
            (EditStep::LocationKind, Input::Location(point)) => FieldEdit::Geolocation(point),
            (EditStep::AwaitLocation { keep_city }, Input::Location(point)) => {
                if keep_city {
                    FieldEdit::Geolocation(point)
                } else {
                    FieldEdit::GeolocationOnly(point)
                }
            }

            (EditStep::AdditionalPhotos { mut photos }, Input::Photo(p)) => {
                let max = listing.category.max_additional_photos();
                photos.push(p);
                check_additional_photos(listing.category, &photos)?;
                if photos.len() < max {
                    let reply = Reply::prompt(prompts::photo_added(photos.len(), max), Menu::photos_done());
                    return Ok(Next::Stay(EditStep::AdditionalPhotos { photos }, reply));
                }
                FieldEdit::AdditionalPhotos(photos)
            }
            (EditStep::AdditionalPhotos { photos }, Input::Action(A::Done)) => {
                FieldEdit::AdditionalPhotos(photos)
            }
            (EditStep::AdditionalPhotos { .. }, Input::Action(A::Skip)) => {
                FieldEdit::AdditionalPhotos(Vec::<PhotoRef>::new())
            }

            (EditStep::Field(field), input) => field_edit(field, input)?,

            _ => return Err(ValidationError::UnexpectedInput),
        };
        Ok(Next::Commit(edit))
    }
}

/// Map a single-field input onto its mutation. Field invariants are checked on apply.
fn field_edit(field: EditField, input: Input) -> Result<FieldEdit, ValidationError> {
    use Action as A;

    let edit = match (field, input) {
        (EditField::Category, Input::Action(A::Category(c))) => FieldEdit::Category(c),
        (EditField::Category, Input::Text(t)) => {
            FieldEdit::Category(Category::parse(&t).ok_or(ValidationError::UnknownCategory(t))?)
        }
        (EditField::Title, Input::Text(t)) => FieldEdit::Title(t),
        (EditField::Price, Input::Text(t)) => FieldEdit::Price(Price::parse(&t)?),
        (EditField::Price, Input::Action(A::Free)) => FieldEdit::Price(Price::Free),
        (EditField::PrimaryPhoto, Input::Photo(p)) => FieldEdit::PrimaryPhoto(p),
        (EditField::Description, Input::Text(t)) => FieldEdit::Description(t),
        (EditField::Description, Input::Action(A::Skip)) => FieldEdit::Description(String::new()),
        (EditField::City, Input::Action(A::City(c))) => FieldEdit::City(c),
        (EditField::City, Input::Text(t)) => {
            FieldEdit::City(City::parse(&t).ok_or(ValidationError::UnknownCity(t))?)
        }
        (EditField::Contact, Input::Text(t)) => FieldEdit::Contact(t),
        (EditField::Vigency, Input::Action(A::Vigency(v))) => FieldEdit::Vigency(v),
        (EditField::Vigency, Input::Text(t)) => {
            FieldEdit::Vigency(Vigency::parse(&t).ok_or(ValidationError::UnexpectedInput)?)
        }
        _ => return Err(ValidationError::UnexpectedInput),
    };
    Ok(edit)
}

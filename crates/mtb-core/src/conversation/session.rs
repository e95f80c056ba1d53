//! Per-user conversation state and typed drafts.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    catalog::{Category, City},
    conversation::action::EditField,
    domain::{GeoPoint, ListingId, PhotoRef, UserId},
    errors::ValidationError,
    listing::{check_additional_photos, Location, NewListing, Photos, Price, Vigency},
    search::{ResultCursor, SearchQuery},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Session {
    #[default]
    Idle,
    Create {
        step: CreateStep,
        draft: CreateDraft,
    },
    Edit {
        listing: ListingId,
        step: EditStep,
    },
    ConfirmDelete {
        listing: ListingId,
    },
    Search {
        step: SearchStep,
        query: SearchQuery,
    },
    Results {
        cursor: ResultCursor,
    },
    Admin {
        step: AdminStep,
    },
}

impl Session {
    pub fn is_idle(&self) -> bool {
        matches!(self, Session::Idle)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Session::Idle => "idle",
            Session::Create { .. } => "create",
            Session::Edit { .. } => "edit",
            Session::ConfirmDelete { .. } => "confirm_delete",
            Session::Search { .. } => "search",
            Session::Results { .. } => "results",
            Session::Admin { .. } => "admin",
        }
    }
}

// ============== Create ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateStep {
    Category,
    Title,
    Description,
    PrimaryPhoto,
    AdditionalPhotos,
    Price,
    City,
    /// City chosen: keep it alone or add coordinates.
    LocationKind,
    Geolocation,
    Contact,
    Vigency,
}

/// Fields accumulated by the create flow. Every field is optional until `finish`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateDraft {
    pub category: Option<Category>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub primary_photo: Option<PhotoRef>,
    pub additional_photos: Vec<PhotoRef>,
    pub price: Option<Price>,
    pub city: Option<City>,
    pub point: Option<GeoPoint>,
    pub contact: Option<String>,
}

impl CreateDraft {
    /// Room left for additional photos under the chosen category's cap.
    pub fn photo_cap(&self) -> usize {
        self.category
            .unwrap_or(Category::Other)
            .max_additional_photos()
    }

    pub fn push_photo(&mut self, photo: PhotoRef) -> Result<(), ValidationError> {
        let max = self.photo_cap();
        if self.additional_photos.len() >= max {
            return Err(ValidationError::TooManyPhotos { max });
        }
        self.additional_photos.push(photo);
        Ok(())
    }

    /// Convert into a complete listing request; every required field must be present.
    pub fn finish(self, vigency: Vigency) -> Result<NewListing, ValidationError> {
        let category = self.category.ok_or(ValidationError::MissingField("category"))?;
        check_additional_photos(category, &self.additional_photos)?;
        Ok(NewListing {
            category,
            title: self.title.ok_or(ValidationError::MissingField("title"))?,
            description: self.description.unwrap_or_default(),
            photos: Photos {
                primary: self
                    .primary_photo
                    .ok_or(ValidationError::MissingField("photo"))?,
                additional: self.additional_photos,
            },
            price: self.price.ok_or(ValidationError::MissingField("price"))?,
            location: Location::from_parts(self.city, self.point)?,
            contact: self.contact.ok_or(ValidationError::MissingField("contact"))?,
            vigency,
        })
    }
}

// ============== Edit ==============

#[derive(Clone, Debug, PartialEq)]
pub enum EditStep {
    ChooseField,
    Field(EditField),
    /// Geolocation field: choose whether the city is kept.
    LocationKind,
    AwaitLocation { keep_city: bool },
    AdditionalPhotos { photos: Vec<PhotoRef> },
}

// ============== Search ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStep {
    Keyword,
    Category,
    City,
}

// ============== Admin ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminStep {
    ChooseAction,
    EnterUserId { ban: bool },
}

// ============== Session table ==============

/// One lock per user, held for the whole handling of one event.
#[derive(Default)]
pub struct SessionTable {
    inner: Mutex<HashMap<UserId, Arc<Mutex<Session>>>>,
}

impl SessionTable {
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<Session> {
        let slot = {
            let mut map = self.inner.lock().await;
            map.entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(Session::Idle)))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Snapshot of a user's session (tests and diagnostics).
    pub async fn get(&self, user: UserId) -> Session {
        self.lock(user).await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_draft() -> CreateDraft {
        CreateDraft {
            category: Some(Category::Books),
            title: Some("Novela".into()),
            description: None,
            primary_photo: Some(PhotoRef("p".into())),
            additional_photos: vec![],
            price: Some(Price::Free),
            city: Some(City::Loja),
            point: None,
            contact: Some("099".into()),
        }
    }

    #[test]
    fn finish_requires_every_field() {
        let new = full_draft().finish(Vigency::ThreeDays).unwrap();
        assert_eq!(new.description, "");
        assert_eq!(new.location, Location::City(City::Loja));

        let mut draft = full_draft();
        draft.primary_photo = None;
        assert_eq!(
            draft.finish(Vigency::ThreeDays),
            Err(ValidationError::MissingField("photo"))
        );

        let mut draft = full_draft();
        draft.city = None;
        assert_eq!(
            draft.finish(Vigency::ThreeDays),
            Err(ValidationError::LocationRequired)
        );
    }

    #[test]
    fn push_photo_respects_category_cap() {
        let mut draft = full_draft();
        for i in 0..3 {
            draft.push_photo(PhotoRef(format!("a{i}"))).unwrap();
        }
        assert_eq!(
            draft.push_photo(PhotoRef("extra".into())),
            Err(ValidationError::TooManyPhotos { max: 3 })
        );
        assert_eq!(draft.additional_photos.len(), 3);

        draft.category = Some(Category::MovingKit);
        draft.push_photo(PhotoRef("kit".into())).unwrap();
        assert_eq!(draft.photo_cap(), 9);
    }

    #[tokio::test]
    async fn session_table_serializes_per_user() {
        let table = SessionTable::default();
        {
            let mut guard = table.lock(UserId(1)).await;
            *guard = Session::ConfirmDelete {
                listing: ListingId(3),
            };
        }
        assert_eq!(
            table.get(UserId(1)).await,
            Session::ConfirmDelete {
                listing: ListingId(3)
            }
        );
        assert!(table.get(UserId(2)).await.is_idle());
    }
}

//! Typed button/command tokens.
//!
//! Every inline button carries an encoded `Action` as its callback data. The
//! transport decodes it once; the state machine only ever matches on variants.

use std::fmt;

use crate::{
    catalog::{Category, City},
    domain::ListingId,
    listing::Vigency,
};

/// Telegram rejects callback data longer than this many bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Editable listing fields, one per edit-flow invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditField {
    Category,
    Title,
    Price,
    PrimaryPhoto,
    AdditionalPhotos,
    Description,
    City,
    Location,
    Contact,
    Vigency,
}

const EDIT_FIELDS: [(EditField, &str, &str); 10] = [
    (EditField::Category, "category", "📋 Categoría"),
    (EditField::Title, "title", "✏️ Título"),
    (EditField::Price, "price", "💰 Precio"),
    (EditField::PrimaryPhoto, "photo", "📸 Foto principal"),
    (EditField::AdditionalPhotos, "photos", "📷 Fotos adicionales"),
    (EditField::Description, "description", "📝 Descripción"),
    (EditField::City, "city", "🏙️ Ciudad"),
    (EditField::Location, "location", "📍 Geolocalización"),
    (EditField::Contact, "contact", "📞 Contacto"),
    (EditField::Vigency, "vigency", "📅 Vigencia"),
];

impl EditField {
    pub fn all() -> impl Iterator<Item = EditField> {
        EDIT_FIELDS.iter().map(|(f, ..)| *f)
    }

    pub fn key(self) -> &'static str {
        EDIT_FIELDS[self as usize].1
    }

    pub fn label(self) -> &'static str {
        EDIT_FIELDS[self as usize].2
    }

    pub fn from_key(key: &str) -> Option<Self> {
        EDIT_FIELDS
            .iter()
            .find(|(_, k, _)| *k == key)
            .map(|(f, ..)| *f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Cancel,
    Skip,
    Done,

    // Main menu
    NewListing,
    Search,
    MyListings,

    // Pickers
    Category(Category),
    /// "Gratis": free price in the create/edit flow, free-only filter in search.
    Free,
    City(City),
    /// Keep the city, no coordinates.
    CityOnly,
    /// Send coordinates, keeping any city.
    Geolocation,
    /// Send coordinates and clear the city.
    GeolocationOnly,
    Vigency(Vigency),
    EditField(EditField),

    // Listing actions
    View(ListingId),
    Edit(ListingId),
    Delete(ListingId),
    ConfirmDelete(ListingId),

    // Result browsing; `Open` indexes the full result list.
    Open(usize),
    PrevItem,
    NextItem,
    PrevPage,
    NextPage,
    BackToResults,

    // Administration
    Admin,
    Ban,
    Unban,
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Action::Start => "start".to_string(),
            Action::Cancel => "cancel".to_string(),
            Action::Skip => "skip".to_string(),
            Action::Done => "done".to_string(),
            Action::NewListing => "new".to_string(),
            Action::Search => "search".to_string(),
            Action::MyListings => "mine".to_string(),
            Action::Category(c) => format!("cat:{}", c.key()),
            Action::Free => "free".to_string(),
            Action::City(c) => format!("city:{}", c.key()),
            Action::CityOnly => "loc:city".to_string(),
            Action::Geolocation => "loc:geo".to_string(),
            Action::GeolocationOnly => "loc:geoonly".to_string(),
            Action::Vigency(v) => format!("vig:{}", v.key()),
            Action::EditField(f) => format!("field:{}", f.key()),
            Action::View(id) => format!("view:{id}"),
            Action::Edit(id) => format!("edit:{id}"),
            Action::Delete(id) => format!("del:{id}"),
            Action::ConfirmDelete(id) => format!("delok:{id}"),
            Action::Open(index) => format!("open:{index}"),
            Action::PrevItem => "item:prev".to_string(),
            Action::NextItem => "item:next".to_string(),
            Action::PrevPage => "page:prev".to_string(),
            Action::NextPage => "page:next".to_string(),
            Action::BackToResults => "back".to_string(),
            Action::Admin => "admin".to_string(),
            Action::Ban => "admin:ban".to_string(),
            Action::Unban => "admin:unban".to_string(),
        }
    }

    /// `None` for unknown or stale payloads.
    pub fn decode(data: &str) -> Option<Self> {
        let action = match data {
            "start" => Action::Start,
            "cancel" => Action::Cancel,
            "skip" => Action::Skip,
            "done" => Action::Done,
            "new" => Action::NewListing,
            "search" => Action::Search,
            "mine" => Action::MyListings,
            "free" => Action::Free,
            "loc:city" => Action::CityOnly,
            "loc:geo" => Action::Geolocation,
            "loc:geoonly" => Action::GeolocationOnly,
            "item:prev" => Action::PrevItem,
            "item:next" => Action::NextItem,
            "page:prev" => Action::PrevPage,
            "page:next" => Action::NextPage,
            "back" => Action::BackToResults,
            "admin" => Action::Admin,
            "admin:ban" => Action::Ban,
            "admin:unban" => Action::Unban,
            _ => {
                let (kind, arg) = data.split_once(':')?;
                match kind {
                    "cat" => Action::Category(Category::from_key(arg)?),
                    "city" => Action::City(City::from_key(arg)?),
                    "vig" => Action::Vigency(Vigency::from_key(arg)?),
                    "field" => Action::EditField(EditField::from_key(arg)?),
                    "view" => Action::View(arg.parse().ok()?),
                    "edit" => Action::Edit(arg.parse().ok()?),
                    "del" => Action::Delete(arg.parse().ok()?),
                    "delok" => Action::ConfirmDelete(arg.parse().ok()?),
                    "open" => Action::Open(arg.parse().ok()?),
                    _ => return None,
                }
            }
        };
        Some(action)
    }

    /// Slash commands the transport maps onto actions (name without the `/`).
    pub fn from_command(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "start" | "menu" => Some(Action::Start),
            "cancel" | "cancelar" => Some(Action::Cancel),
            "new" | "nuevo" => Some(Action::NewListing),
            "search" | "buscar" => Some(Action::Search),
            "mine" | "mis" => Some(Action::MyListings),
            "admin" => Some(Action::Admin),
            _ => None,
        }
    }

    /// Actions that open a flow (and are refused to banned users).
    pub fn starts_flow(&self) -> bool {
        matches!(
            self,
            Action::Start
                | Action::NewListing
                | Action::Search
                | Action::MyListings
                | Action::View(_)
                | Action::Edit(_)
                | Action::Delete(_)
                | Action::Admin
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Action> {
        vec![
            Action::Start,
            Action::Skip,
            Action::Category(Category::Electronics),
            Action::City(City::SantoDomingo),
            Action::Vigency(Vigency::NoExpiry),
            Action::EditField(EditField::AdditionalPhotos),
            Action::ConfirmDelete(ListingId(u64::MAX)),
            Action::Open(usize::MAX),
            Action::GeolocationOnly,
            Action::Unban,
        ]
    }

    #[test]
    fn encoded_actions_decode_back() {
        for action in samples() {
            assert_eq!(Action::decode(&action.encode()), Some(action), "{action}");
        }
    }

    #[test]
    fn encoded_actions_fit_callback_limit() {
        for action in samples() {
            assert!(action.encode().len() <= MAX_CALLBACK_BYTES, "{action}");
        }
        for category in Category::ALL {
            assert!(Action::Category(category).encode().len() <= MAX_CALLBACK_BYTES);
        }
    }

    #[test]
    fn garbage_payloads_are_rejected() {
        for data in ["", "cat:calzado", "view:abc", "open:-1", "nope", "city:Lima"] {
            assert_eq!(Action::decode(data), None, "{data}");
        }
    }

    #[test]
    fn edit_fields_have_unique_keys() {
        let keys: std::collections::HashSet<_> = EditField::all().map(EditField::key).collect();
        assert_eq!(keys.len(), 10);
        for field in EditField::all() {
            assert_eq!(EditField::from_key(field.key()), Some(field));
        }
    }
}

//! Listing model, field validation and lifecycle rules.

use std::{fmt, sync::OnceLock};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Category, City},
    domain::{GeoPoint, ListingId, PhotoRef, UserId},
    errors::ValidationError,
};

pub const TITLE_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Literal accepted as "free" in price input (case-insensitive).
pub const FREE_MARKER: &str = "gratis";

// ============== Price ==============

/// Asking price. `Free` is the canonical free/paid flag; `is_free` and `status`
/// are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Price {
    Free,
    /// Amount in cents, always > 0.
    Amount(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Sell,
    Free,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Sell => "sell",
            Status::Free => "free",
        }
    }
}

impl Price {
    pub fn is_free(self) -> bool {
        matches!(self, Price::Free)
    }

    pub fn status(self) -> Status {
        match self {
            Price::Free => Status::Free,
            Price::Amount(_) => Status::Sell,
        }
    }

    /// Parse user input: a non-negative decimal (`.` or `,` separator) or the free marker.
    ///
    /// Amounts are rounded half-up to cents. Zero is free; a positive amount that
    /// rounds to zero cents is refused.
    pub fn parse(input: &str) -> Result<Price, ValidationError> {
        static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();
        let re = AMOUNT_RE
            .get_or_init(|| Regex::new(r"^\+?([0-9]*)(?:[.,]([0-9]*))?$").expect("valid regex"));

        let text = input.trim().trim_start_matches('$').trim();
        if text.eq_ignore_ascii_case(FREE_MARKER) {
            return Ok(Price::Free);
        }

        let caps = re.captures(text).ok_or(ValidationError::InvalidPrice)?;
        let whole = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let frac = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        if whole.is_empty() && frac.is_empty() {
            return Err(ValidationError::InvalidPrice);
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ValidationError::InvalidPrice)?
        };

        let digit = |i: usize| -> u64 {
            frac.as_bytes()
                .get(i)
                .map(|b| u64::from(b - b'0'))
                .unwrap_or(0)
        };
        let mut cents = digit(0) * 10 + digit(1);
        if digit(2) >= 5 {
            cents += 1;
        }

        let total = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or(ValidationError::InvalidPrice)?;

        if total == 0 {
            // A positive amount below one cent is not a way to say "free".
            if frac.bytes().any(|b| b != b'0') {
                return Err(ValidationError::InvalidPrice);
            }
            return Ok(Price::Free);
        }
        Ok(Price::Amount(total))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Free => f.write_str("Gratis"),
            Price::Amount(cents) => write!(f, "{}.{:02}", cents / 100, cents % 100),
        }
    }
}

// ============== Vigency ==============

/// How long a listing stays active after posting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vigency {
    ThreeDays,
    FiveDays,
    NoExpiry,
}

impl Vigency {
    pub fn key(self) -> &'static str {
        match self {
            Vigency::ThreeDays => "3d",
            Vigency::FiveDays => "5d",
            Vigency::NoExpiry => "none",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "3d" => Some(Vigency::ThreeDays),
            "5d" => Some(Vigency::FiveDays),
            "none" => Some(Vigency::NoExpiry),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Vigency::ThreeDays => "📅 3 días",
            Vigency::FiveDays => "📅 5 días",
            Vigency::NoExpiry => "♾ Sin vencimiento",
        }
    }

    /// Typed text such as `3`, `5 días` or `📅 3 días`.
    pub fn parse(input: &str) -> Option<Self> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.as_str() {
            "3" => Some(Vigency::ThreeDays),
            "5" => Some(Vigency::FiveDays),
            _ => None,
        }
    }

    pub fn expires_at(self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Vigency::ThreeDays => Some(from + Duration::days(3)),
            Vigency::FiveDays => Some(from + Duration::days(5)),
            Vigency::NoExpiry => None,
        }
    }
}

// ============== Location ==============

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Location {
    City(City),
    CityWithGeo { city: City, point: GeoPoint },
    GeoOnly(GeoPoint),
}

impl Location {
    pub fn from_parts(city: Option<City>, point: Option<GeoPoint>) -> Result<Self, ValidationError> {
        match (city, point) {
            (Some(city), Some(point)) => Ok(Location::CityWithGeo { city, point }),
            (Some(city), None) => Ok(Location::City(city)),
            (None, Some(point)) => Ok(Location::GeoOnly(point)),
            (None, None) => Err(ValidationError::LocationRequired),
        }
    }

    pub fn city(&self) -> Option<City> {
        match self {
            Location::City(city) | Location::CityWithGeo { city, .. } => Some(*city),
            Location::GeoOnly(_) => None,
        }
    }

    pub fn point(&self) -> Option<GeoPoint> {
        match self {
            Location::CityWithGeo { point, .. } | Location::GeoOnly(point) => Some(*point),
            Location::City(_) => None,
        }
    }
}

// ============== Photos ==============

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Photos {
    pub primary: PhotoRef,
    pub additional: Vec<PhotoRef>,
}

impl Photos {
    pub fn iter(&self) -> impl Iterator<Item = &PhotoRef> {
        std::iter::once(&self.primary).chain(self.additional.iter())
    }
}

pub fn check_additional_photos(
    category: Category,
    additional: &[PhotoRef],
) -> Result<(), ValidationError> {
    let max = category.max_additional_photos();
    if additional.len() > max {
        return Err(ValidationError::TooManyPhotos { max });
    }
    Ok(())
}

// ============== Field validation ==============

pub fn validate_title(input: &str) -> Result<String, ValidationError> {
    let title = input.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(title.to_string())
}

pub fn validate_description(input: &str) -> Result<String, ValidationError> {
    let description = input.trim();
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::DescriptionTooLong {
            max: DESCRIPTION_MAX_CHARS,
        });
    }
    Ok(description.to_string())
}

pub fn validate_contact(input: &str) -> Result<String, ValidationError> {
    let contact = input.trim();
    if contact.is_empty() {
        return Err(ValidationError::ContactEmpty);
    }
    Ok(contact.to_string())
}

// ============== Listing ==============

#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub owner: UserId,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub photos: Photos,
    pub price: Price,
    pub location: Location,
    pub contact: String,
    pub posted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub views: u32,
}

/// Fully accumulated create-flow draft, every required field present.
#[derive(Clone, Debug, PartialEq)]
pub struct NewListing {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub photos: Photos,
    pub price: Price,
    pub location: Location,
    pub contact: String,
    pub vigency: Vigency,
}

impl Listing {
    pub fn create(
        id: ListingId,
        owner: UserId,
        new: NewListing,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let listing = Self {
            id,
            owner,
            category: new.category,
            title: validate_title(&new.title)?,
            description: validate_description(&new.description)?,
            photos: new.photos,
            price: new.price,
            location: new.location,
            contact: validate_contact(&new.contact)?,
            posted_at: now,
            expires_at: new.vigency.expires_at(now),
            views: 0,
        };
        listing.validate()?;
        Ok(listing)
    }

    /// Check every invariant a persisted listing must satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_contact(&self.contact)?;
        check_additional_photos(self.category, &self.photos.additional)?;
        if let Some(expires_at) = self.expires_at {
            if expires_at <= self.posted_at {
                return Err(ValidationError::ExpiryNotAfterPosting);
            }
        }
        Ok(())
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |t| t > now)
    }

    pub fn is_free(&self) -> bool {
        self.price.is_free()
    }

    pub fn city(&self) -> Option<City> {
        self.location.city()
    }

    /// Case-insensitive substring match on title or description. Empty keyword matches.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        keyword.is_empty()
            || self.title.to_lowercase().contains(&keyword)
            || self.description.to_lowercase().contains(&keyword)
    }

    /// Apply one field edit. Only the invariant touched by the field is re-checked and
    /// the listing is left unchanged on error.
    pub fn apply(&mut self, edit: FieldEdit, now: DateTime<Utc>) -> Result<(), ValidationError> {
        match edit {
            FieldEdit::Category(category) => {
                check_additional_photos(category, &self.photos.additional)?;
                self.category = category;
            }
            FieldEdit::Title(title) => self.title = validate_title(&title)?,
            FieldEdit::Description(description) => {
                self.description = validate_description(&description)?
            }
            FieldEdit::Price(price) => self.price = price,
            FieldEdit::PrimaryPhoto(photo) => self.photos.primary = photo,
            FieldEdit::AdditionalPhotos(photos) => {
                check_additional_photos(self.category, &photos)?;
                self.photos.additional = photos;
            }
            FieldEdit::City(city) => self.location = Location::City(city),
            FieldEdit::Geolocation(point) => {
                self.location = Location::from_parts(self.location.city(), Some(point))?
            }
            FieldEdit::GeolocationOnly(point) => self.location = Location::GeoOnly(point),
            FieldEdit::Contact(contact) => self.contact = validate_contact(&contact)?,
            FieldEdit::Vigency(vigency) => self.expires_at = vigency.expires_at(now),
        }
        Ok(())
    }
}

/// A single-field mutation, as produced by one edit-flow invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldEdit {
    Category(Category),
    Title(String),
    Description(String),
    Price(Price),
    PrimaryPhoto(PhotoRef),
    AdditionalPhotos(Vec<PhotoRef>),
    /// City only; clears any stored coordinates.
    City(City),
    /// Coordinates, keeping the current city when there is one.
    Geolocation(GeoPoint),
    /// Coordinates only; clears the city.
    GeolocationOnly(GeoPoint),
    Contact(String),
    /// Resets `expires_at` relative to the edit time.
    Vigency(Vigency),
}

// ============== Stored record ==============

/// On-disk shape of a listing.
///
/// Field names follow the layout existing `listings.json` files use; `status`,
/// `is_free` and `location_type` are written redundantly and re-derived on read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: RecordId,
    pub user_id: i64,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub photo_id: String,
    #[serde(default)]
    pub additional_photo_ids: Vec<String>,
    pub price: serde_json::Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_free: Option<bool>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub contact: String,
    pub posted_at: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub views: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    pub(crate) fn parse(&self) -> Option<ListingId> {
        let id = match self {
            RecordId::Number(n) => ListingId(*n),
            RecordId::Text(s) => s.parse().ok()?,
        };
        // The top id is reserved so the next allocation always fits.
        (id.0 < u64::MAX).then_some(id)
    }
}

/// Why a stored record was dropped on load.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("bad id")]
    Id,
    #[error("bad timestamp: {0}")]
    Timestamp(String),
    #[error("bad coordinates")]
    Coordinates,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl From<&Listing> for ListingRecord {
    fn from(l: &Listing) -> Self {
        let point = l.location.point();
        Self {
            id: RecordId::Text(l.id.to_string()),
            user_id: l.owner.0,
            category: l.category.key().to_string(),
            title: l.title.clone(),
            description: Some(l.description.clone()),
            photo_id: l.photos.primary.0.clone(),
            additional_photo_ids: l.photos.additional.iter().map(|p| p.0.clone()).collect(),
            price: serde_json::Value::String(l.price.to_string()),
            status: Some(l.price.status().as_str().to_string()),
            is_free: Some(l.is_free()),
            location_type: Some(
                if point.is_some() { "geolocation" } else { "city" }.to_string(),
            ),
            city: l.location.city().map(|c| c.name().to_string()),
            latitude: point.map(|p| p.latitude),
            longitude: point.map(|p| p.longitude),
            contact: l.contact.clone(),
            posted_at: l.posted_at.to_rfc3339(),
            expires_at: l.expires_at.map(|t| t.to_rfc3339()),
            views: l.views,
        }
    }
}

impl TryFrom<ListingRecord> for Listing {
    type Error = RecordError;

    fn try_from(r: ListingRecord) -> Result<Self, Self::Error> {
        let id = r.id.parse().ok_or(RecordError::Id)?;
        let category = Category::parse(&r.category)
            .ok_or_else(|| ValidationError::UnknownCategory(r.category.clone()))?;

        let price = record_price(&r.price, r.is_free, r.status.as_deref())?;

        let city = match r.city.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(
                City::parse(name).ok_or_else(|| ValidationError::UnknownCity(name.to_string()))?,
            ),
        };
        let point = match (r.latitude, r.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon).ok_or(RecordError::Coordinates)?),
            _ => None,
        };

        let posted_at = parse_timestamp(&r.posted_at)?;
        let expires_at = match r.expires_at.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw)?),
        };

        let listing = Listing {
            id,
            owner: UserId(r.user_id),
            category,
            title: r.title,
            description: r.description.unwrap_or_default(),
            photos: Photos {
                primary: PhotoRef(r.photo_id),
                additional: r.additional_photo_ids.into_iter().map(PhotoRef).collect(),
            },
            price,
            location: Location::from_parts(city, point)?,
            contact: r.contact,
            posted_at,
            expires_at,
            views: r.views,
        };
        listing.validate()?;
        Ok(listing)
    }
}

/// The price string is authoritative; the redundant flags only fill in when it is unreadable.
fn record_price(
    raw: &serde_json::Value,
    is_free: Option<bool>,
    status: Option<&str>,
) -> Result<Price, ValidationError> {
    let parsed = match raw {
        serde_json::Value::String(s) => Price::parse(s),
        serde_json::Value::Number(n) => Price::parse(&n.to_string()),
        _ => Err(ValidationError::InvalidPrice),
    };
    match parsed {
        Ok(price) => Ok(price),
        Err(_) if is_free == Some(true) || status == Some("free") => Ok(Price::Free),
        Err(e) => Err(e),
    }
}

/// RFC3339, or a naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` read as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RecordError> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(t.and_utc());
        }
    }
    Err(RecordError::Timestamp(raw.to_string()))
}

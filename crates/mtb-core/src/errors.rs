use crate::domain::{ListingId, UserId};

/// Core error type for the marketplace bot.
///
/// Adapter crates should map their specific errors into this type so the bot
/// core can handle failures consistently (user-facing notice vs logged only).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("listing #{0} not found")]
    NotFound(ListingId),

    #[error("user {user} may not modify listing #{listing}")]
    Forbidden { user: UserId, listing: ListingId },

    #[error("no listing ids left")]
    IdsExhausted,

    #[error("user {0} is banned")]
    Banned(UserId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

/// Input that fails a step's acceptance predicate.
///
/// These are recovered locally: the step re-prompts and nothing else changes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title is empty")]
    TitleEmpty,

    #[error("title longer than {max} characters")]
    TitleTooLong { max: usize },

    #[error("description longer than {max} characters")]
    DescriptionTooLong { max: usize },

    #[error("price is not a non-negative amount or the free marker")]
    InvalidPrice,

    #[error("contact is empty")]
    ContactEmpty,

    #[error("at most {max} additional photos")]
    TooManyPhotos { max: usize },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown city: {0}")]
    UnknownCity(String),

    #[error("a city or a geolocation is required")]
    LocationRequired,

    #[error("expiry must be after the posting time")]
    ExpiryNotAfterPosting,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unexpected input for this step")]
    UnexpectedInput,
}

pub type Result<T> = std::result::Result<T, Error>;

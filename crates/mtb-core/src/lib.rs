//! Core domain + application logic for the marketplace Telegram bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `MessagingPort` and is decoded into typed inputs by the adapter crate.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod listing;
pub mod logging;
pub mod messaging;
pub mod render;
pub mod search;
pub mod storage;
pub mod store;

pub use conversation::Marketplace;
pub use errors::{Error, Result, ValidationError};

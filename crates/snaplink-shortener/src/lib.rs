//! Link allocation and owner-facing link management.
//!
//! [`ShortenerService`] implements [`snaplink_core::Shortener`] on top of any
//! [`snaplink_core::LinkRepository`] and [`snaplink_generator::Generator`].

pub mod service;
mod validate;

pub use service::{ShortenerConfig, ShortenerService};
pub use validate::{validate_url, MAX_URL_LENGTH};

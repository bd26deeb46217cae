//! Click enrichment: user agent parsing, referer classification and IP
//! geolocation.
//!
//! Every classifier here is total. Bad input yields a sentinel value, never
//! an error.

pub mod geo;
pub mod referer;
pub mod user_agent;

pub use geo::{GeoApiConfig, IpApiLocator, UnknownLocator};
pub use referer::KnownPlatformReferers;
pub use user_agent::WootheeClassifier;

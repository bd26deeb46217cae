//! HTTP surface of the Snaplink URL shortener.
//!
//! The router is a thin translation layer: request parsing, identity and
//! client metadata extraction, and mapping service errors to statuses.
//! All behavior lives in the service crates behind [`AppState`].

pub mod app;
pub mod cli;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use state::AppState;

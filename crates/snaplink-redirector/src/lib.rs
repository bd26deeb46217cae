//! Short code resolution and background click recording.
//!
//! [`RedirectorService`] answers a redirect as soon as the link is found and
//! hands the click to a [`ClickRecorder`], which enriches and persists it on
//! a detached task. Recording failures are logged and dropped; they never
//! reach the redirect's caller.

pub mod recorder;
pub mod service;

pub use recorder::{ClickRecorder, Enricher};
pub use service::RedirectorService;

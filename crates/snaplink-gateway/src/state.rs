use std::sync::Arc;

use snaplink_core::{Analytics, Redirector, Shortener};

#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<dyn Shortener>,
    pub redirector: Arc<dyn Redirector>,
    pub analytics: Arc<dyn Analytics>,
    base_url: String,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        redirector: Arc<dyn Redirector>,
        analytics: Arc<dyn Analytics>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            redirector,
            analytics,
            base_url: public_base_url.into(),
        }
    }

    /// Public origin that short URLs are rendered against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

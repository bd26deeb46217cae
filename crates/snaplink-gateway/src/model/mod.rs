mod analytics;
mod link;

pub use analytics::AnalyticsResponse;
pub use link::{CreateLinkRequest, LinkResponse, ListQuery};

use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

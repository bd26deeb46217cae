use crate::click::ClickRecord;
use crate::error::AnalyticsError;
use crate::link::{LinkId, OwnerId};
use crate::page::{Page, PageRequest};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-dimension click counts for one link.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_clicks: u64,
    pub browsers: BTreeMap<String, u64>,
    pub os: BTreeMap<String, u64>,
    pub devices: BTreeMap<String, u64>,
    pub countries: BTreeMap<String, u64>,
    pub referer_sources: BTreeMap<String, u64>,
    /// The most frequent referring domains only; direct traffic has none.
    pub referer_domains: BTreeMap<String, u64>,
}

#[async_trait]
pub trait Analytics: Send + Sync + 'static {
    /// Aggregates a link's full click history for its owner.
    async fn summary(&self, link_id: LinkId, requester: OwnerId) -> Result<AnalyticsSummary, AnalyticsError>;

    /// Pages through a link's raw clicks, newest first, for its owner.
    async fn clicks(
        &self,
        link_id: LinkId,
        requester: OwnerId,
        page: PageRequest,
    ) -> Result<Page<ClickRecord>, AnalyticsError>;
}

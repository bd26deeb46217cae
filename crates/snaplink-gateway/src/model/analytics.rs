use std::collections::BTreeMap;

use serde::Serialize;
use snaplink_core::AnalyticsSummary;

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub short_code: String,
    pub total_clicks: u64,
    pub browsers: BTreeMap<String, u64>,
    pub os: BTreeMap<String, u64>,
    pub devices: BTreeMap<String, u64>,
    pub countries: BTreeMap<String, u64>,
    pub referer_sources: BTreeMap<String, u64>,
    pub referer_domains: BTreeMap<String, u64>,
}

impl AnalyticsResponse {
    pub fn new(short_code: impl Into<String>, summary: AnalyticsSummary) -> Self {
        Self {
            short_code: short_code.into(),
            total_clicks: summary.total_clicks,
            browsers: summary.browsers,
            os: summary.os,
            devices: summary.devices,
            countries: summary.countries,
            referer_sources: summary.referer_sources,
            referer_domains: summary.referer_domains,
        }
    }
}

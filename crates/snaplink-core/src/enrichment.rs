//! Contracts for the collaborators that annotate a raw click.
//!
//! All three are total: they degrade to a sentinel value instead of failing,
//! so a click is never dropped because enrichment went wrong.

use crate::click::DeviceClass;
use async_trait::async_trait;

/// Sentinel used when a dimension cannot be determined.
pub const UNKNOWN: &str = "Unknown";
/// Country code reported alongside [`UNKNOWN`].
pub const UNKNOWN_COUNTRY_CODE: &str = "XX";
/// Referer source for requests without a referer.
pub const DIRECT: &str = "Direct";
/// Referer source for referers that match no known platform.
pub const OTHER: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser: String,
    pub version: String,
    pub os: String,
    pub device: DeviceClass,
}

impl UserAgentInfo {
    pub fn unknown() -> Self {
        Self {
            browser: UNKNOWN.to_string(),
            version: String::new(),
            os: UNKNOWN.to_string(),
            device: DeviceClass::Desktop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: String,
    pub country_code: String,
    pub city: String,
}

impl GeoInfo {
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            country_code: UNKNOWN_COUNTRY_CODE.to_string(),
            city: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefererInfo {
    /// Platform name such as "Facebook", or [`DIRECT`] / [`OTHER`].
    pub source: String,
    /// Referring host without a leading `www.`; empty when unknown.
    pub domain: String,
}

impl RefererInfo {
    pub fn direct() -> Self {
        Self {
            source: DIRECT.to_string(),
            domain: String::new(),
        }
    }

    pub fn other(domain: impl Into<String>) -> Self {
        Self {
            source: OTHER.to_string(),
            domain: domain.into(),
        }
    }
}

pub trait UserAgentClassifier: Send + Sync + 'static {
    fn classify(&self, user_agent: &str) -> UserAgentInfo;
}

pub trait RefererClassifier: Send + Sync + 'static {
    fn classify(&self, referer: &str) -> RefererInfo;
}

#[async_trait]
pub trait GeoLocator: Send + Sync + 'static {
    /// Locates a client address. Never fails; returns [`GeoInfo::unknown`]
    /// for loopback or empty addresses and on any lookup error.
    async fn locate(&self, ip_address: &str) -> GeoInfo;
}

use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use snaplink_core::enrichment::{UNKNOWN, UNKNOWN_COUNTRY_CODE};
use snaplink_core::{GeoInfo, GeoLocator};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{trace, warn};
use typed_builder::TypedBuilder;
use ureq::Agent;

pub const DEFAULT_API_URL_TEMPLATE: &str =
    "http://ip-api.com/json/{ip}?fields=status,country,countryCode,city";

/// Settings for [`IpApiLocator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct GeoApiConfig {
    /// Lookup URL; `{ip}` is replaced with the client address.
    #[builder(default = DEFAULT_API_URL_TEMPLATE.to_string(), setter(into))]
    pub url_template: String,
    /// Whole-request timeout, connect included.
    #[builder(default = Duration::from_secs(5))]
    pub timeout: Duration,
    #[builder(default = 10_000)]
    pub cache_capacity: u64,
    #[builder(default = Duration::from_secs(15 * 60))]
    pub cache_ttl: Duration,
}

/// Subset of the ip-api.com response. Other providers with the same field
/// names work too.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    city: String,
}

/// Geolocates public addresses through an HTTP JSON API.
///
/// Successful lookups are cached per address; concurrent lookups of the
/// same address share one request. Failures are not cached.
pub struct IpApiLocator {
    agent: Agent,
    url_template: String,
    cache: Cache<String, GeoInfo>,
}

impl IpApiLocator {
    pub fn new(config: GeoApiConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            agent,
            url_template: config.url_template,
            cache,
        }
    }

    fn fetch_sync(agent: &Agent, url: &str) -> Option<GeoInfo> {
        let response = match agent.get(url).call() {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "geo lookup request failed");
                return None;
            }
        };

        let body: LookupResponse = match response.into_body().read_json() {
            Ok(body) => body,
            Err(e) => {
                warn!(url, error = %e, "geo lookup response is not valid JSON");
                return None;
            }
        };

        if body.status == "fail" {
            trace!(url, "geo lookup reported failure");
            return None;
        }

        Some(GeoInfo {
            country: non_empty_or(body.country, UNKNOWN),
            country_code: non_empty_or(body.country_code, UNKNOWN_COUNTRY_CODE),
            city: non_empty_or(body.city, UNKNOWN),
        })
    }

    async fn fetch(&self, ip: &IpAddr) -> Option<GeoInfo> {
        let agent = self.agent.clone();
        let url = self.url_template.replace("{ip}", &ip.to_string());

        tokio::task::spawn_blocking(move || Self::fetch_sync(&agent, &url))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "geo lookup task failed");
                None
            })
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn is_public_v4(v4: &Ipv4Addr) -> bool {
    !(v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast())
}

/// Whether an address can be meaningfully geolocated.
///
/// IPv4-mapped IPv6 addresses follow the IPv4 rules.
fn is_public(ip: &IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => is_public_v4(&v4),
        IpAddr::V6(v6) => {
            // fc00::/7 unique local, fe80::/10 link local
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn locate(&self, ip_address: &str) -> GeoInfo {
        let Ok(ip) = ip_address.trim().parse::<IpAddr>().map(|ip| ip.to_canonical()) else {
            trace!(ip_address, "skipping geo lookup for unparseable address");
            return GeoInfo::unknown();
        };
        if !is_public(&ip) {
            return GeoInfo::unknown();
        }

        self.cache
            .optionally_get_with(ip.to_string(), self.fetch(&ip))
            .await
            .unwrap_or_else(GeoInfo::unknown)
    }
}

/// Locator that never looks anything up.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownLocator;

#[async_trait]
impl GeoLocator for UnknownLocator {
    async fn locate(&self, _ip_address: &str) -> GeoInfo {
        GeoInfo::unknown()
    }
}

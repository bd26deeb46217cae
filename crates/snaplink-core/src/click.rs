use crate::enrichment::{GeoInfo, RefererInfo, UserAgentInfo};
use crate::link::LinkId;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Raw request metadata captured when a short code is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickInfo {
    pub ip_address: String,
    pub user_agent: String,
    pub referer: String,
}

/// Coarse device classification derived from the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Bot,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "Desktop",
            DeviceClass::Mobile => "Mobile",
            DeviceClass::Bot => "Bot",
        }
    }
}

impl Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Desktop" => Ok(DeviceClass::Desktop),
            "Mobile" => Ok(DeviceClass::Mobile),
            "Bot" => Ok(DeviceClass::Bot),
            other => Err(format!("unknown device class '{other}'")),
        }
    }
}

// Column widths of the clicks table.
const IP_ADDRESS_MAX: usize = 45;
const USER_AGENT_MAX: usize = 512;
const BROWSER_MAX: usize = 50;
const BROWSER_VERSION_MAX: usize = 20;
const OS_MAX: usize = 50;
const COUNTRY_MAX: usize = 100;
const COUNTRY_CODE_MAX: usize = 2;
const CITY_MAX: usize = 100;
const REFERER_MAX: usize = 2048;
const REFERER_SOURCE_MAX: usize = 50;
const REFERER_DOMAIN_MAX: usize = 255;

/// An enriched click, ready to be committed together with the counter bump.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClick {
    pub link_id: LinkId,
    pub ip_address: String,
    pub user_agent: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub device: DeviceClass,
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub referer: String,
    pub referer_source: String,
    pub referer_domain: String,
    pub clicked_at: Timestamp,
}

impl NewClick {
    /// Assembles a click from raw metadata and the collaborators' results.
    ///
    /// Every field is cut to its column width so oversized headers can
    /// never fail the insert.
    pub fn new(
        link_id: LinkId,
        info: ClickInfo,
        user_agent: UserAgentInfo,
        geo: GeoInfo,
        referer: RefererInfo,
        clicked_at: Timestamp,
    ) -> Self {
        Self {
            link_id,
            ip_address: truncated(info.ip_address, IP_ADDRESS_MAX),
            user_agent: truncated(info.user_agent, USER_AGENT_MAX),
            browser: truncated(user_agent.browser, BROWSER_MAX),
            browser_version: truncated(user_agent.version, BROWSER_VERSION_MAX),
            os: truncated(user_agent.os, OS_MAX),
            device: user_agent.device,
            country: truncated(geo.country, COUNTRY_MAX),
            country_code: truncated(geo.country_code, COUNTRY_CODE_MAX),
            city: truncated(geo.city, CITY_MAX),
            referer: truncated(info.referer, REFERER_MAX),
            referer_source: truncated(referer.source, REFERER_SOURCE_MAX),
            referer_domain: truncated(referer.domain, REFERER_DOMAIN_MAX),
            clicked_at,
        }
    }
}

/// An immutable, committed click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub id: u64,
    pub link_id: LinkId,
    pub ip_address: String,
    pub user_agent: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub device: DeviceClass,
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub referer: String,
    pub referer_source: String,
    pub referer_domain: String,
    pub clicked_at: Timestamp,
}

impl ClickRecord {
    pub fn from_new(id: u64, click: NewClick) -> Self {
        Self {
            id,
            link_id: click.link_id,
            ip_address: click.ip_address,
            user_agent: click.user_agent,
            browser: click.browser,
            browser_version: click.browser_version,
            os: click.os,
            device: click.device,
            country: click.country,
            country_code: click.country_code,
            city: click.city,
            referer: click.referer,
            referer_source: click.referer_source,
            referer_domain: click.referer_domain,
            clicked_at: click.clicked_at,
        }
    }
}

/// A column analytics can group clicks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickDimension {
    Browser,
    Os,
    Device,
    Country,
    RefererSource,
    RefererDomain,
}

impl ClickDimension {
    /// The value this dimension takes for a given click.
    pub fn value_of<'a>(&self, click: &'a ClickRecord) -> &'a str {
        match self {
            ClickDimension::Browser => &click.browser,
            ClickDimension::Os => &click.os,
            ClickDimension::Device => click.device.as_str(),
            ClickDimension::Country => &click.country,
            ClickDimension::RefererSource => &click.referer_source,
            ClickDimension::RefererDomain => &click.referer_domain,
        }
    }
}

fn truncated(mut value: String, max: usize) -> String {
    if value.len() > max {
        let mut end = max;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_respects_char_boundaries() {
        assert_eq!(truncated("abcdef".to_string(), 4), "abcd");
        assert_eq!(truncated("abc".to_string(), 4), "abc");
        // 'é' is two bytes; cutting at 2 would split it.
        assert_eq!(truncated("aé".to_string(), 2), "a");
    }

    #[test]
    fn new_click_clamps_oversized_fields() {
        let info = ClickInfo {
            ip_address: "203.0.113.9".to_string(),
            user_agent: "x".repeat(600),
            referer: "https://example.com/".to_string() + &"p".repeat(3000),
        };
        let click = NewClick::new(
            LinkId(1),
            info,
            UserAgentInfo::unknown(),
            GeoInfo::unknown(),
            RefererInfo::direct(),
            Timestamp::now(),
        );

        assert_eq!(click.user_agent.len(), USER_AGENT_MAX);
        assert_eq!(click.referer.len(), REFERER_MAX);
        assert_eq!(click.ip_address, "203.0.113.9");
        assert_eq!(click.country_code, "XX");
    }

    #[test]
    fn device_class_round_trips_through_text() {
        for device in [DeviceClass::Desktop, DeviceClass::Mobile, DeviceClass::Bot] {
            assert_eq!(device.as_str().parse::<DeviceClass>().unwrap(), device);
        }
        assert!("Tablet".parse::<DeviceClass>().is_err());
    }
}

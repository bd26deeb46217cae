use snaplink_core::enrichment::UNKNOWN;
use snaplink_core::{DeviceClass, UserAgentClassifier, UserAgentInfo};
use woothee::parser::Parser;

/// woothee's marker for fields it could not detect.
const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

/// User agent classifier backed by woothee.
#[derive(Debug, Default, Clone, Copy)]
pub struct WootheeClassifier;

impl WootheeClassifier {
    pub fn new() -> Self {
        Self
    }
}

fn device_for(category: &str) -> DeviceClass {
    match category {
        "smartphone" | "mobilephone" => DeviceClass::Mobile,
        "crawler" => DeviceClass::Bot,
        _ => DeviceClass::Desktop,
    }
}

fn known_or(value: &str, fallback: &str) -> String {
    if value.is_empty() || value == WOOTHEE_UNKNOWN {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

impl UserAgentClassifier for WootheeClassifier {
    fn classify(&self, user_agent: &str) -> UserAgentInfo {
        let Some(result) = Parser::new().parse(user_agent) else {
            return UserAgentInfo::unknown();
        };

        UserAgentInfo {
            browser: known_or(result.name, UNKNOWN),
            version: known_or(result.version, ""),
            os: known_or(&result.os, UNKNOWN),
            device: device_for(result.category),
        }
    }
}

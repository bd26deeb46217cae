use snaplink_core::{RefererClassifier, RefererInfo};
use url::Url;

/// Hosts of well-known platforms, matched exactly or as a parent domain.
const KNOWN_PLATFORMS: &[(&str, &str)] = &[
    ("facebook.com", "Facebook"),
    ("fb.com", "Facebook"),
    ("google.com", "Google"),
    ("google.co", "Google"),
    ("twitter.com", "Twitter"),
    ("t.co", "Twitter"),
    ("x.com", "Twitter"),
    ("instagram.com", "Instagram"),
    ("linkedin.com", "LinkedIn"),
    ("lnkd.in", "LinkedIn"),
    ("youtube.com", "YouTube"),
    ("youtu.be", "YouTube"),
    ("tiktok.com", "TikTok"),
    ("reddit.com", "Reddit"),
    ("pinterest.com", "Pinterest"),
    ("telegram.org", "Telegram"),
    ("t.me", "Telegram"),
    ("zalo.me", "Zalo"),
    ("messenger.com", "Messenger"),
];

/// Maps a referer URL to the platform it came from.
#[derive(Debug, Default, Clone, Copy)]
pub struct KnownPlatformReferers;

impl KnownPlatformReferers {
    pub fn new() -> Self {
        Self
    }
}

fn platform_for(host: &str) -> Option<&'static str> {
    KNOWN_PLATFORMS
        .iter()
        .find(|(domain, _)| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, source)| *source)
}

impl RefererClassifier for KnownPlatformReferers {
    fn classify(&self, referer: &str) -> RefererInfo {
        if referer.is_empty() {
            return RefererInfo::direct();
        }

        let Ok(url) = Url::parse(referer) else {
            return RefererInfo::other("");
        };

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

        match platform_for(&host) {
            Some(source) => RefererInfo {
                source: source.to_string(),
                domain: host,
            },
            None => RefererInfo::other(host),
        }
    }
}

use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Store-assigned identity of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u64);

/// Opaque identity of a link owner (a registered user or a guest account).
///
/// Resolved and validated upstream; this crate only compares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

impl Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted mapping from a short code to a destination URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    /// `None` for links created anonymously.
    pub owner: Option<OwnerId>,
    pub short_code: ShortCode,
    pub original_url: String,
    /// Number of recorded clicks. Only ever advanced by the click recorder.
    pub click_count: u64,
    pub expire_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Soft-deletion marker. Deleted links are hidden from every lookup.
    pub deleted_at: Option<Timestamp>,
}

impl Link {
    /// The caller-chosen alias, if this link was created with one.
    pub fn custom_alias(&self) -> Option<&str> {
        self.short_code
            .is_custom()
            .then(|| self.short_code.as_str())
    }

    /// Whether the link's expiry lies strictly before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expire_at.is_some_and(|expire_at| expire_at < now)
    }

    pub fn is_owned_by(&self, owner: OwnerId) -> bool {
        self.owner == Some(owner)
    }
}

/// A link about to be inserted. The store assigns id, counter and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub owner: Option<OwnerId>,
    pub short_code: ShortCode,
    pub original_url: String,
    pub expire_at: Option<Timestamp>,
}

impl NewLink {
    /// Materializes the row a store writes for this link.
    pub fn into_link(self, id: LinkId, now: Timestamp) -> Link {
        Link {
            id,
            owner: self.owner,
            short_code: self.short_code,
            original_url: self.original_url,
            click_count: 0,
            expire_at: self.expire_at,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

use crate::link::{Link, OwnerId};
use crate::page::{Page, PageRequest};
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use std::time::Duration;
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// Expiration policy for a shortened URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ExpirationPolicy {
    /// The shortened URL never expires.
    #[default]
    Never,
    /// The shortened URL expires after a certain duration from now.
    AfterDuration(Duration),
    /// The shortened URL expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

impl ExpirationPolicy {
    /// Resolves the policy to an absolute expiry relative to `now`.
    ///
    /// Returns `None` for durations too large to represent.
    pub fn expire_at(&self, now: Timestamp) -> Option<Option<Timestamp>> {
        match self {
            ExpirationPolicy::Never => Some(None),
            ExpirationPolicy::AfterDuration(duration) => {
                let duration = SignedDuration::try_from(*duration).ok()?;
                now.checked_add(duration).ok().map(Some)
            }
            ExpirationPolicy::AtTimestamp(timestamp) => Some(Some(*timestamp)),
        }
    }
}

/// Parameters for allocating a new link.
#[derive(Debug, Clone, TypedBuilder)]
pub struct AllocateParams {
    /// The destination URL.
    #[builder(setter(into))]
    pub original_url: String,
    /// Optional caller-chosen short code.
    #[builder(default)]
    pub custom_alias: Option<String>,
    /// Owner of the new link; `None` creates an anonymous link.
    #[builder(default)]
    pub owner: Option<OwnerId>,
    #[builder(default)]
    pub expiration: ExpirationPolicy,
    /// Length of a generated code. Falls back to the service default.
    #[builder(default)]
    pub code_length: Option<usize>,
}

/// Link creation and owner-facing link management.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a link under a fresh generated code or the requested alias.
    async fn allocate(&self, params: AllocateParams) -> Result<Link>;

    /// Lists the owner's live links, newest first.
    async fn links_for_owner(&self, owner: OwnerId, page: PageRequest) -> Result<Page<Link>>;

    /// Returns a link if `requester` owns it.
    async fn link_detail(&self, code: &str, requester: OwnerId) -> Result<Link>;

    /// Soft-deletes a link if `requester` owns it.
    async fn delete_link(&self, code: &str, requester: OwnerId) -> Result<()>;
}

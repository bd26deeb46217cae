use crate::click::{ClickDimension, ClickRecord, NewClick};
use crate::error::StorageError;
use crate::link::{Link, LinkId, NewLink, OwnerId};
use crate::page::PageRequest;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only view of the link store.
///
/// Soft-deleted links are invisible through every method here.
#[async_trait]
pub trait LinkReadRepository: Send + Sync + 'static {
    /// Retrieves a non-deleted link by short code.
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<Link>>;

    /// Retrieves a non-deleted link by id.
    async fn get_by_id(&self, id: LinkId) -> Result<Option<Link>>;
}

#[async_trait]
pub trait LinkRepository: LinkReadRepository {
    /// Inserts a link, relying on the unique index on the short code.
    ///
    /// Returns `Err(Conflict)` when the code is taken, including by a
    /// soft-deleted link.
    async fn insert(&self, link: NewLink) -> Result<Link>;

    /// Inserts a link under a caller-chosen code.
    ///
    /// The existence check and the insert run as one serialized step per
    /// code: of any number of concurrent calls for the same code exactly
    /// one returns `Ok`, every other one returns `Err(Conflict)`.
    async fn insert_alias(&self, link: NewLink) -> Result<Link>;

    /// Lists an owner's non-deleted links, newest first, with the total count.
    async fn list_by_owner(&self, owner: OwnerId, page: PageRequest) -> Result<(Vec<Link>, u64)>;

    /// Marks a link as deleted. Returns `true` if it was live before.
    async fn soft_delete(&self, id: LinkId) -> Result<bool>;
}

/// The append-only click log.
#[async_trait]
pub trait ClickRepository: Send + Sync + 'static {
    /// Appends a click and advances the owning link's counter by one.
    ///
    /// Both writes commit together or not at all, and the counter is bumped
    /// by the store itself so concurrent recordings never lose an increment.
    async fn record(&self, click: NewClick) -> Result<ClickRecord>;

    /// Lists a link's clicks, newest first, with the total count.
    async fn list_by_link(&self, link_id: LinkId, page: PageRequest) -> Result<(Vec<ClickRecord>, u64)>;

    /// Number of clicks recorded for a link.
    async fn count_by_link(&self, link_id: LinkId) -> Result<u64>;

    /// Click counts per value of `dimension`, largest first.
    ///
    /// Empty values are skipped. `limit` keeps only the first N groups.
    async fn count_by_dimension(
        &self,
        link_id: LinkId,
        dimension: ClickDimension,
        limit: Option<usize>,
    ) -> Result<Vec<(String, u64)>>;
}

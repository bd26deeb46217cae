//! Core types and traits for the Snaplink URL shortener.
//!
//! This crate provides the domain model shared by the allocator, the
//! redirector and the analytics service, the storage and enrichment
//! contracts they are written against, and the ownership gate.

pub mod analytics;
pub mod click;
pub mod enrichment;
pub mod error;
pub mod link;
pub mod ownership;
pub mod page;
pub mod redirector;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use analytics::{Analytics, AnalyticsSummary};
pub use click::{ClickDimension, ClickInfo, ClickRecord, DeviceClass, NewClick};
pub use enrichment::{GeoInfo, GeoLocator, RefererClassifier, RefererInfo, UserAgentClassifier, UserAgentInfo};
pub use error::{AccessError, AnalyticsError, RedirectError, ShortenerError, StorageError};
pub use link::{Link, LinkId, NewLink, OwnerId};
pub use page::{Page, PageRequest};
pub use redirector::Redirector;
pub use repository::{ClickRepository, LinkReadRepository, LinkRepository};
pub use shortcode::ShortCode;
pub use shortener::{AllocateParams, ExpirationPolicy, Shortener};

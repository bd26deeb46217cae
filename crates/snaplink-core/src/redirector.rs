use crate::click::ClickInfo;
use crate::error::RedirectError;
use async_trait::async_trait;

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to its destination URL.
    ///
    /// On success a click recording for `info` has been scheduled in the
    /// background; the caller never waits for it.
    async fn resolve(&self, code: &str, info: ClickInfo) -> Result<String, RedirectError>;
}

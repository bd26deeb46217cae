use crate::recorder::ClickRecorder;
use async_trait::async_trait;
use jiff::Timestamp;
use snaplink_core::{ClickInfo, LinkReadRepository, RedirectError, Redirector, ShortCode};
use std::sync::Arc;
use tracing::{debug, trace};

/// Service for handling URL redirects.
///
/// Uses a read-only repository to fetch links, rejects expired ones and
/// schedules a click recording for every successful resolution.
#[derive(Clone)]
pub struct RedirectorService<R> {
    repository: Arc<R>,
    recorder: ClickRecorder,
}

impl<R: LinkReadRepository> RedirectorService<R> {
    pub fn new(repository: R, recorder: ClickRecorder) -> Self {
        Self {
            repository: Arc::new(repository),
            recorder,
        }
    }

    pub fn recorder(&self) -> &ClickRecorder {
        &self.recorder
    }
}

#[async_trait]
impl<R: LinkReadRepository> Redirector for RedirectorService<R> {
    async fn resolve(&self, code: &str, info: ClickInfo) -> Result<String, RedirectError> {
        trace!(code, "resolving short code");

        let Some(short_code) = ShortCode::lookup(code) else {
            trace!(code, "malformed short code");
            return Err(RedirectError::LinkNotFound);
        };

        let Some(link) = self.repository.get_by_code(&short_code).await? else {
            trace!(code, "short code not found");
            return Err(RedirectError::LinkNotFound);
        };

        if link.is_expired_at(Timestamp::now()) {
            debug!(code, "link has expired");
            return Err(RedirectError::LinkExpired);
        }

        self.recorder.submit(link.id, info);

        debug!(code, url = %link.original_url, "resolved short code");
        Ok(link.original_url)
    }
}

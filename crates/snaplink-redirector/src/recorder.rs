use jiff::Timestamp;
use snaplink_core::{
    ClickInfo, ClickRecord, ClickRepository, GeoLocator, LinkId, NewClick, RefererClassifier,
    StorageError, UserAgentClassifier,
};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace};

/// Derives browser, location and referer data for a raw click.
#[derive(Clone)]
pub struct Enricher {
    user_agents: Arc<dyn UserAgentClassifier>,
    referers: Arc<dyn RefererClassifier>,
    geo: Arc<dyn GeoLocator>,
}

impl Enricher {
    pub fn new(
        user_agents: Arc<dyn UserAgentClassifier>,
        referers: Arc<dyn RefererClassifier>,
        geo: Arc<dyn GeoLocator>,
    ) -> Self {
        Self {
            user_agents,
            referers,
            geo,
        }
    }

    pub async fn enrich(&self, link_id: LinkId, info: ClickInfo, clicked_at: Timestamp) -> NewClick {
        let user_agent = self.user_agents.classify(&info.user_agent);
        let referer = self.referers.classify(&info.referer);
        let geo = self.geo.locate(&info.ip_address).await;

        NewClick::new(link_id, info, user_agent, geo, referer, clicked_at)
    }
}

/// Records clicks off the request path.
///
/// Every submitted click runs on its own tracked task so callers can wait
/// for outstanding work, e.g. on shutdown. Clones share the same tracker.
#[derive(Clone)]
pub struct ClickRecorder {
    clicks: Arc<dyn ClickRepository>,
    enricher: Enricher,
    tracker: TaskTracker,
}

impl ClickRecorder {
    pub fn new(clicks: Arc<dyn ClickRepository>, enricher: Enricher) -> Self {
        Self {
            clicks,
            enricher,
            tracker: TaskTracker::new(),
        }
    }

    /// Enriches and persists one click, advancing the link's counter.
    pub async fn record(
        &self,
        link_id: LinkId,
        info: ClickInfo,
        clicked_at: Timestamp,
    ) -> Result<ClickRecord, StorageError> {
        let click = self.enricher.enrich(link_id, info, clicked_at).await;
        self.clicks.record(click).await
    }

    /// Schedules a recording and returns immediately.
    ///
    /// The outcome is only visible in the logs.
    pub fn submit(&self, link_id: LinkId, info: ClickInfo) {
        let recorder = self.clone();
        let clicked_at = Timestamp::now();

        self.tracker.spawn(async move {
            match recorder.record(link_id, info, clicked_at).await {
                Ok(click) => trace!(link_id = %link_id, click_id = click.id, "click recorded"),
                Err(e) => error!(link_id = %link_id, error = %e, "failed to record click"),
            }
        });
    }

    /// Number of recordings still in flight.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every recording submitted so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Waits for outstanding recordings during shutdown.
    pub async fn shutdown(&self) {
        let pending = self.tracker.len();
        if pending > 0 {
            debug!(pending, "draining click recordings");
        }
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaplink_core::{DeviceClass, LinkReadRepository, LinkRepository, NewLink, ShortCode};
    use snaplink_enrichment::{KnownPlatformReferers, UnknownLocator, WootheeClassifier};
    use snaplink_storage::InMemoryStore;

    fn enricher() -> Enricher {
        Enricher::new(
            Arc::new(WootheeClassifier::new()),
            Arc::new(KnownPlatformReferers::new()),
            Arc::new(UnknownLocator),
        )
    }

    #[tokio::test]
    async fn record_enriches_and_bumps_counter() {
        let store = InMemoryStore::new();
        let link = store
            .insert(NewLink {
                owner: None,
                short_code: ShortCode::generated("abc123"),
                original_url: "https://example.com".to_string(),
                expire_at: None,
            })
            .await
            .unwrap();
        let recorder = ClickRecorder::new(Arc::new(store.clone()), enricher());

        let info = ClickInfo {
            ip_address: "127.0.0.1".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://www.facebook.com/".to_string(),
        };
        let click = recorder.record(link.id, info, Timestamp::now()).await.unwrap();

        assert_eq!(click.browser, "Chrome");
        assert_eq!(click.device, DeviceClass::Desktop);
        assert_eq!(click.referer_source, "Facebook");
        assert_eq!(click.referer_domain, "facebook.com");
        assert_eq!(click.country_code, "XX");

        let link = store.get_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(link.click_count, 1);
    }

    #[tokio::test]
    async fn submitted_clicks_drain_on_wait() {
        let store = InMemoryStore::new();
        let link = store
            .insert(NewLink {
                owner: None,
                short_code: ShortCode::generated("abc123"),
                original_url: "https://example.com".to_string(),
                expire_at: None,
            })
            .await
            .unwrap();
        let recorder = ClickRecorder::new(Arc::new(store.clone()), enricher());

        for _ in 0..5 {
            recorder.submit(link.id, ClickInfo::default());
        }
        recorder.wait_idle().await;
        assert_eq!(recorder.pending(), 0);
        assert_eq!(store.count_by_link(link.id).await.unwrap(), 5);

        // The recorder keeps accepting work after an idle wait.
        recorder.submit(link.id, ClickInfo::default());
        recorder.shutdown().await;
        assert_eq!(store.count_by_link(link.id).await.unwrap(), 6);
    }
}

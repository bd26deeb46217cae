use async_trait::async_trait;
use snaplink_core::ownership::authorize;
use snaplink_core::{
    Analytics, AnalyticsError, AnalyticsSummary, ClickDimension, ClickRecord, ClickRepository, Link,
    LinkId, LinkReadRepository, OwnerId, Page, PageRequest, StorageError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Clone, TypedBuilder)]
pub struct AnalyticsConfig {
    /// How many referring domains a summary lists.
    #[builder(default = 10)]
    pub top_referer_domains: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Aggregates the click log of a link for its owner.
///
/// Every dimension is computed by the click store itself; nothing is
/// materialized in memory beyond the grouped counts.
pub struct AnalyticsService<L, C> {
    links: Arc<L>,
    clicks: Arc<C>,
    config: AnalyticsConfig,
}

impl<L, C> Clone for AnalyticsService<L, C> {
    fn clone(&self) -> Self {
        Self {
            links: self.links.clone(),
            clicks: self.clicks.clone(),
            config: self.config.clone(),
        }
    }
}

impl<L: LinkReadRepository, C: ClickRepository> AnalyticsService<L, C> {
    pub fn new(links: L, clicks: C, config: AnalyticsConfig) -> Self {
        Self {
            links: Arc::new(links),
            clicks: Arc::new(clicks),
            config,
        }
    }

    async fn owned_link(&self, link_id: LinkId, requester: OwnerId) -> Result<Link> {
        let link = self.links.get_by_id(link_id).await?;
        Ok(authorize(link, requester)?)
    }

    async fn grouped(
        &self,
        link_id: LinkId,
        dimension: ClickDimension,
        limit: Option<usize>,
    ) -> std::result::Result<BTreeMap<String, u64>, StorageError> {
        let groups = self.clicks.count_by_dimension(link_id, dimension, limit).await?;
        Ok(groups.into_iter().collect())
    }
}

#[async_trait]
impl<L: LinkReadRepository, C: ClickRepository> Analytics for AnalyticsService<L, C> {
    async fn summary(&self, link_id: LinkId, requester: OwnerId) -> Result<AnalyticsSummary> {
        let link = self.owned_link(link_id, requester).await?;
        trace!(link_id = %link.id, "aggregating clicks");

        let (total_clicks, browsers, os, devices, countries, referer_sources, referer_domains) = tokio::try_join!(
            self.clicks.count_by_link(link.id),
            self.grouped(link.id, ClickDimension::Browser, None),
            self.grouped(link.id, ClickDimension::Os, None),
            self.grouped(link.id, ClickDimension::Device, None),
            self.grouped(link.id, ClickDimension::Country, None),
            self.grouped(link.id, ClickDimension::RefererSource, None),
            self.grouped(
                link.id,
                ClickDimension::RefererDomain,
                Some(self.config.top_referer_domains)
            ),
        )?;

        Ok(AnalyticsSummary {
            total_clicks,
            browsers,
            os,
            devices,
            countries,
            referer_sources,
            referer_domains,
        })
    }

    async fn clicks(
        &self,
        link_id: LinkId,
        requester: OwnerId,
        page: PageRequest,
    ) -> Result<Page<ClickRecord>> {
        let link = self.owned_link(link_id, requester).await?;
        let (clicks, total) = self.clicks.list_by_link(link.id, page).await?;
        Ok(Page::new(clicks, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;
    use snaplink_core::{
        ClickInfo, DeviceClass, GeoInfo, LinkRepository, NewClick, NewLink, RefererInfo, ShortCode,
        UserAgentInfo,
    };
    use snaplink_storage::InMemoryStore;

    fn service(store: &InMemoryStore) -> AnalyticsService<InMemoryStore, InMemoryStore> {
        AnalyticsService::new(
            store.clone(),
            store.clone(),
            AnalyticsConfig::builder().top_referer_domains(2).build(),
        )
    }

    async fn link(store: &InMemoryStore, owner: Option<u64>) -> LinkId {
        store
            .insert(NewLink {
                owner: owner.map(OwnerId),
                short_code: ShortCode::generated(format!("code{}", owner.unwrap_or(0))),
                original_url: "https://example.com".to_string(),
                expire_at: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn click(store: &InMemoryStore, link_id: LinkId, browser: &str, device: DeviceClass, referer: RefererInfo) {
        store
            .record(NewClick::new(
                link_id,
                ClickInfo::default(),
                UserAgentInfo {
                    browser: browser.to_string(),
                    version: String::new(),
                    os: "Linux".to_string(),
                    device,
                },
                GeoInfo::unknown(),
                referer,
                Timestamp::now(),
            ))
            .await
            .unwrap();
    }

    fn referer(source: &str, domain: &str) -> RefererInfo {
        RefererInfo {
            source: source.to_string(),
            domain: domain.to_string(),
        }
    }

    async fn seeded() -> (InMemoryStore, LinkId) {
        let store = InMemoryStore::new();
        let id = link(&store, Some(1)).await;

        click(&store, id, "Chrome", DeviceClass::Desktop, referer("Google", "google.com")).await;
        click(&store, id, "Chrome", DeviceClass::Mobile, referer("Google", "google.com")).await;
        click(&store, id, "Firefox", DeviceClass::Desktop, referer("Facebook", "facebook.com")).await;
        click(&store, id, "Safari", DeviceClass::Mobile, referer("Other", "blog.example.org")).await;
        click(&store, id, "Googlebot", DeviceClass::Bot, RefererInfo::direct()).await;
        (store, id)
    }

    #[tokio::test]
    async fn summary_groups_every_dimension() {
        let (store, id) = seeded().await;
        let summary = service(&store).summary(id, OwnerId(1)).await.unwrap();

        assert_eq!(summary.total_clicks, 5);
        assert_eq!(summary.browsers["Chrome"], 2);
        assert_eq!(summary.browsers["Firefox"], 1);
        assert_eq!(summary.devices["Desktop"], 2);
        assert_eq!(summary.devices["Mobile"], 2);
        assert_eq!(summary.devices["Bot"], 1);
        assert_eq!(summary.os["Linux"], 5);
        assert_eq!(summary.countries["Unknown"], 5);
        assert_eq!(summary.referer_sources["Google"], 2);
        assert_eq!(summary.referer_sources["Direct"], 1);

        // Top two domains; direct traffic has no domain.
        assert_eq!(summary.referer_domains.len(), 2);
        assert_eq!(summary.referer_domains["google.com"], 2);
        assert_eq!(summary.referer_domains["blog.example.org"], 1);
    }

    #[tokio::test]
    async fn dimensions_add_up_to_the_total() {
        let (store, id) = seeded().await;
        let summary = service(&store).summary(id, OwnerId(1)).await.unwrap();

        for dimension in [
            &summary.browsers,
            &summary.os,
            &summary.devices,
            &summary.countries,
            &summary.referer_sources,
        ] {
            assert_eq!(dimension.values().sum::<u64>(), summary.total_clicks);
        }
    }

    #[tokio::test]
    async fn link_without_clicks_has_empty_summary() {
        let store = InMemoryStore::new();
        let id = link(&store, Some(1)).await;

        let summary = service(&store).summary(id, OwnerId(1)).await.unwrap();
        assert_eq!(summary, AnalyticsSummary::default());
    }

    #[tokio::test]
    async fn only_the_owner_sees_analytics() {
        let (store, id) = seeded().await;
        let anonymous = link(&store, None).await;
        let service = service(&store);

        let err = service.summary(id, OwnerId(2)).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Unauthorized));

        let err = service.summary(anonymous, OwnerId(1)).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Unauthorized));

        let err = service.summary(LinkId(404), OwnerId(1)).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::LinkNotFound));

        let err = service
            .clicks(id, OwnerId(2), PageRequest::new(1, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Unauthorized));
    }

    #[tokio::test]
    async fn click_history_is_paged() {
        let (store, id) = seeded().await;

        let page = service(&store)
            .clicks(id, OwnerId(1), PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 2);
        assert!(page.items.iter().all(|click| click.link_id == id));
    }

    #[tokio::test]
    async fn deleted_link_has_no_analytics() {
        let (store, id) = seeded().await;
        store.soft_delete(id).await.unwrap();

        let err = service(&store).summary(id, OwnerId(1)).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::LinkNotFound));
    }
}

use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::RwLock;
use snaplink_core::repository::{ClickRepository, LinkReadRepository, LinkRepository, Result};
use snaplink_core::{
    ClickDimension, ClickRecord, Link, LinkId, NewClick, NewLink, OwnerId, PageRequest, ShortCode,
    StorageError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tables {
    last_link_id: u64,
    last_click_id: u64,
    links: BTreeMap<LinkId, Link>,
    /// Every code ever handed out, soft-deleted links included.
    codes: HashMap<String, LinkId>,
    clicks: Vec<ClickRecord>,
}

impl Tables {
    fn live_link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id).filter(|link| link.deleted_at.is_none())
    }

    fn insert_link(&mut self, new_link: NewLink) -> Result<Link> {
        let key = new_link.short_code.as_str();
        if self.codes.contains_key(key) {
            return Err(StorageError::Conflict(key.to_owned()));
        }

        self.last_link_id += 1;
        let id = LinkId(self.last_link_id);
        self.codes.insert(key.to_owned(), id);

        let link = new_link.into_link(id, Timestamp::now());
        self.links.insert(id, link.clone());
        Ok(link)
    }
}

/// In-memory link and click store.
///
/// All tables sit behind a single lock, so every operation is trivially
/// linearizable: alias reservation and click recording never interleave.
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn page_of<T: Clone>(rows: &[T], page: PageRequest) -> Vec<T> {
    rows.iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl LinkReadRepository for InMemoryStore {
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<Link>> {
        let tables = self.tables.read();
        let link = tables
            .codes
            .get(code.as_str())
            .and_then(|id| tables.live_link(*id))
            .cloned();
        Ok(link)
    }

    async fn get_by_id(&self, id: LinkId) -> Result<Option<Link>> {
        Ok(self.tables.read().live_link(id).cloned())
    }
}

#[async_trait]
impl LinkRepository for InMemoryStore {
    async fn insert(&self, link: NewLink) -> Result<Link> {
        self.tables.write().insert_link(link)
    }

    async fn insert_alias(&self, link: NewLink) -> Result<Link> {
        // The write lock already serializes check and insert.
        self.tables.write().insert_link(link)
    }

    async fn list_by_owner(&self, owner: OwnerId, page: PageRequest) -> Result<(Vec<Link>, u64)> {
        let tables = self.tables.read();
        let mut owned: Vec<&Link> = tables
            .links
            .values()
            .filter(|link| link.deleted_at.is_none() && link.is_owned_by(owner))
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = owned.len() as u64;
        let items = page_of(&owned, page).into_iter().cloned().collect();
        Ok((items, total))
    }

    async fn soft_delete(&self, id: LinkId) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(link) = tables.links.get_mut(&id) else {
            return Ok(false);
        };
        if link.deleted_at.is_some() {
            return Ok(false);
        }

        let now = Timestamp::now();
        link.deleted_at = Some(now);
        link.updated_at = now;
        Ok(true)
    }
}

#[async_trait]
impl ClickRepository for InMemoryStore {
    async fn record(&self, click: NewClick) -> Result<ClickRecord> {
        let mut tables = self.tables.write();
        let link_id = click.link_id;

        let link = tables
            .links
            .get_mut(&link_id)
            .ok_or_else(|| StorageError::NotFound(format!("link {link_id}")))?;
        link.click_count += 1;

        tables.last_click_id += 1;
        let record = ClickRecord::from_new(tables.last_click_id, click);
        tables.clicks.push(record.clone());
        Ok(record)
    }

    async fn list_by_link(&self, link_id: LinkId, page: PageRequest) -> Result<(Vec<ClickRecord>, u64)> {
        let tables = self.tables.read();
        let mut clicks: Vec<&ClickRecord> = tables
            .clicks
            .iter()
            .filter(|click| click.link_id == link_id)
            .collect();
        clicks.sort_by(|a, b| b.clicked_at.cmp(&a.clicked_at).then(b.id.cmp(&a.id)));

        let total = clicks.len() as u64;
        let items = page_of(&clicks, page).into_iter().cloned().collect();
        Ok((items, total))
    }

    async fn count_by_link(&self, link_id: LinkId) -> Result<u64> {
        let tables = self.tables.read();
        let count = tables
            .clicks
            .iter()
            .filter(|click| click.link_id == link_id)
            .count();
        Ok(count as u64)
    }

    async fn count_by_dimension(
        &self,
        link_id: LinkId,
        dimension: ClickDimension,
        limit: Option<usize>,
    ) -> Result<Vec<(String, u64)>> {
        let tables = self.tables.read();
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for click in tables.clicks.iter().filter(|click| click.link_id == link_id) {
            let value = dimension.value_of(click);
            if !value.is_empty() {
                *counts.entry(value).or_default() += 1;
            }
        }

        let mut groups: Vec<(String, u64)> = counts
            .into_iter()
            .map(|(value, count)| (value.to_owned(), count))
            .collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(limit) = limit {
            groups.truncate(limit);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use snaplink_core::{ClickInfo, DeviceClass, GeoInfo, RefererInfo, UserAgentInfo};

    fn new_link(code: ShortCode, owner: Option<u64>) -> NewLink {
        NewLink {
            owner: owner.map(OwnerId),
            short_code: code,
            original_url: "https://example.com".to_string(),
            expire_at: None,
        }
    }

    fn click(link_id: LinkId, browser: &str, referer_domain: &str) -> NewClick {
        NewClick::new(
            link_id,
            ClickInfo::default(),
            UserAgentInfo {
                browser: browser.to_string(),
                version: String::new(),
                os: "Linux".to_string(),
                device: DeviceClass::Desktop,
            },
            GeoInfo::unknown(),
            RefererInfo::other(referer_domain),
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryStore::new();

        let link = store
            .insert(new_link(ShortCode::generated("abc123"), Some(1)))
            .await
            .unwrap();
        assert_eq!(link.click_count, 0);

        let by_code = store.get_by_code(&ShortCode::generated("abc123")).await.unwrap();
        assert_eq!(by_code, Some(link.clone()));
        assert_eq!(store.get_by_id(link.id).await.unwrap(), Some(link));
    }

    #[tokio::test]
    async fn insert_conflict() {
        let store = InMemoryStore::new();
        store
            .insert(new_link(ShortCode::generated("abc123"), None))
            .await
            .unwrap();

        let err = store
            .insert_alias(new_link(ShortCode::alias("abc123").unwrap(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn soft_deleted_links_are_hidden_and_their_codes_retired() {
        let store = InMemoryStore::new();
        let link = store
            .insert(new_link(ShortCode::generated("gone"), Some(1)))
            .await
            .unwrap();

        assert!(store.soft_delete(link.id).await.unwrap());
        assert!(!store.soft_delete(link.id).await.unwrap());
        assert!(store.get_by_id(link.id).await.unwrap().is_none());
        assert!(store
            .get_by_code(&ShortCode::generated("gone"))
            .await
            .unwrap()
            .is_none());

        let err = store
            .insert(new_link(ShortCode::generated("gone"), Some(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_by_owner_pages_newest_first() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .insert(new_link(ShortCode::generated(format!("code{i}")), Some(1)))
                .await
                .unwrap();
        }
        store
            .insert(new_link(ShortCode::generated("theirs"), Some(2)))
            .await
            .unwrap();

        let (first, total) = store.list_by_owner(OwnerId(1), PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(total, 5);
        let codes: Vec<_> = first.iter().map(|l| l.short_code.as_str()).collect();
        assert_eq!(codes, ["code4", "code3"]);

        let (last, _) = store.list_by_owner(OwnerId(1), PageRequest::new(3, 2)).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].short_code.as_str(), "code0");
    }

    #[tokio::test]
    async fn record_bumps_counter_with_the_click() {
        let store = InMemoryStore::new();
        let link = store
            .insert(new_link(ShortCode::generated("abc123"), None))
            .await
            .unwrap();

        let record = store.record(click(link.id, "Chrome", "")).await.unwrap();
        assert_eq!(record.link_id, link.id);

        let link = store.get_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(link.click_count, 1);
        assert_eq!(store.count_by_link(link.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn record_for_missing_link_writes_nothing() {
        let store = InMemoryStore::new();

        let err = store.record(click(LinkId(42), "Chrome", "")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(store.count_by_link(LinkId(42)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn count_by_dimension_skips_empty_and_honours_limit() {
        let store = InMemoryStore::new();
        let link = store
            .insert(new_link(ShortCode::generated("abc123"), None))
            .await
            .unwrap();

        for (browser, domain) in [
            ("Chrome", "news.ycombinator.com"),
            ("Chrome", "news.ycombinator.com"),
            ("Firefox", "lobste.rs"),
            ("Safari", ""),
        ] {
            store.record(click(link.id, browser, domain)).await.unwrap();
        }

        let browsers = store
            .count_by_dimension(link.id, ClickDimension::Browser, None)
            .await
            .unwrap();
        assert_eq!(
            browsers,
            vec![
                ("Chrome".to_string(), 2),
                ("Firefox".to_string(), 1),
                ("Safari".to_string(), 1)
            ]
        );

        let domains = store
            .count_by_dimension(link.id, ClickDimension::RefererDomain, Some(1))
            .await
            .unwrap();
        assert_eq!(domains, vec![("news.ycombinator.com".to_string(), 2)]);
    }

    #[tokio::test]
    async fn list_by_link_is_newest_first() {
        let store = InMemoryStore::new();
        let link = store
            .insert(new_link(ShortCode::generated("abc123"), None))
            .await
            .unwrap();

        let mut older = click(link.id, "Chrome", "");
        older.clicked_at = Timestamp::now() - SignedDuration::from_hours(1);
        store.record(older).await.unwrap();
        store.record(click(link.id, "Firefox", "")).await.unwrap();

        let (clicks, total) = store.list_by_link(link.id, PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(clicks[0].browser, "Firefox");
        assert_eq!(clicks[1].browser, "Chrome");
    }

    #[tokio::test]
    async fn concurrent_alias_inserts_have_one_winner() {
        let store = InMemoryStore::new();
        let mut handles = vec![];

        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut link = new_link(ShortCode::alias("my-link").unwrap(), Some(1));
                link.original_url = format!("https://example{i}.com");
                store.insert_alias(link).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(err) => assert!(matches!(err, StorageError::Conflict(_))),
            }
        }
        assert_eq!(wins, 1);
    }
}

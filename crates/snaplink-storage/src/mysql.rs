use async_trait::async_trait;
use jiff::Timestamp;
use snaplink_core::repository::{ClickRepository, LinkReadRepository, LinkRepository, Result};
use snaplink_core::{
    ClickDimension, ClickRecord, DeviceClass, Link, LinkId, NewClick, NewLink, OwnerId, PageRequest,
    ShortCode, StorageError,
};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, MySqlPool, Row, Transaction};
use tracing::{debug, info};

const LINK_COLUMNS: &str = r#"
    id, owner_id, short_code, original_url, custom_alias, click_count,
    expire_at, created_at, updated_at, deleted_at
"#;

/// Upper bound on deadlock retries of one alias reservation.
const ALIAS_RESERVATION_ATTEMPTS: usize = 5;

const CLICK_COLUMNS: &str = r#"
    id, link_id, ip_address, user_agent, browser, browser_version, os, device,
    country, country_code, city, referer, referer_source, referer_domain, clicked_at
"#;

/// MySQL implementation of the link and click stores.
///
/// Timestamps are stored as unix seconds. Soft-deleted links keep their row
/// so their code stays reserved and their click history stays intact.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("migration failed: {e}")))?;
        info!("mysql schema is up to date");
        Ok(())
    }
}

async fn insert_link(
    tx: &mut Transaction<'static, MySql>,
    link: NewLink,
) -> std::result::Result<Link, sqlx::Error> {
    let now = now_seconds();
    let result = sqlx::query(
        r#"
        INSERT INTO links
            (owner_id, short_code, original_url, custom_alias, click_count,
             expire_at, created_at, updated_at, deleted_at)
        VALUES (?, ?, ?, ?, 0, ?, ?, ?, NULL)
        "#,
    )
    .bind(link.owner.map(|owner| owner.0))
    .bind(link.short_code.as_str())
    .bind(link.original_url.as_str())
    .bind(link.short_code.is_custom().then(|| link.short_code.as_str()))
    .bind(link.expire_at.map(|ts| ts.as_second()))
    .bind(now.as_second())
    .bind(now.as_second())
    .execute(&mut **tx)
    .await?;

    let id = LinkId(result.last_insert_id());
    let mut link = link;
    link.expire_at = link.expire_at.map(truncate_to_second);
    Ok(link.into_link(id, now))
}

fn truncate_to_second(ts: Timestamp) -> Timestamp {
    Timestamp::from_second(ts.as_second()).unwrap_or(ts)
}

fn now_seconds() -> Timestamp {
    truncate_to_second(Timestamp::now())
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn parse_optional_timestamp(column: &str, seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds
        .map(|value| parse_timestamp(column, value))
        .transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

/// InnoDB deadlock victim (SQLSTATE 40001). The aborted transaction has
/// been rolled back and may be retried.
fn is_deadlock(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "40001")
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn link_from_row(row: &MySqlRow) -> Result<Link> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let owner: Option<u64> = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let custom_alias: Option<String> = row.try_get("custom_alias").map_err(map_sqlx_error)?;
    let expire_at: Option<i64> = row.try_get("expire_at").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;
    let deleted_at: Option<i64> = row.try_get("deleted_at").map_err(map_sqlx_error)?;

    Ok(Link {
        id: LinkId(id),
        owner: owner.map(OwnerId),
        short_code: ShortCode::new_unchecked(short_code, custom_alias.is_some()),
        original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
        click_count: row.try_get("click_count").map_err(map_sqlx_error)?,
        expire_at: parse_optional_timestamp("expire_at", expire_at)?,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
        deleted_at: parse_optional_timestamp("deleted_at", deleted_at)?,
    })
}

fn click_from_row(row: &MySqlRow) -> Result<ClickRecord> {
    let link_id: u64 = row.try_get("link_id").map_err(map_sqlx_error)?;
    let device: String = row.try_get("device").map_err(map_sqlx_error)?;
    let device = device
        .parse::<DeviceClass>()
        .map_err(StorageError::InvalidData)?;
    let clicked_at: i64 = row.try_get("clicked_at").map_err(map_sqlx_error)?;

    Ok(ClickRecord {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        link_id: LinkId(link_id),
        ip_address: row.try_get("ip_address").map_err(map_sqlx_error)?,
        user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
        browser: row.try_get("browser").map_err(map_sqlx_error)?,
        browser_version: row.try_get("browser_version").map_err(map_sqlx_error)?,
        os: row.try_get("os").map_err(map_sqlx_error)?,
        device,
        country: row.try_get("country").map_err(map_sqlx_error)?,
        country_code: row.try_get("country_code").map_err(map_sqlx_error)?,
        city: row.try_get("city").map_err(map_sqlx_error)?,
        referer: row.try_get("referer").map_err(map_sqlx_error)?,
        referer_source: row.try_get("referer_source").map_err(map_sqlx_error)?,
        referer_domain: row.try_get("referer_domain").map_err(map_sqlx_error)?,
        clicked_at: parse_timestamp("clicked_at", clicked_at)?,
    })
}

fn dimension_column(dimension: ClickDimension) -> &'static str {
    match dimension {
        ClickDimension::Browser => "browser",
        ClickDimension::Os => "os",
        ClickDimension::Device => "device",
        ClickDimension::Country => "country",
        ClickDimension::RefererSource => "referer_source",
        ClickDimension::RefererDomain => "referer_domain",
    }
}

fn count_to_u64(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| StorageError::InvalidData(format!("negative count {count}")))
}

#[async_trait]
impl LinkReadRepository for MySqlStore {
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ? AND deleted_at IS NULL LIMIT 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn get_by_id(&self, id: LinkId) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = ? AND deleted_at IS NULL LIMIT 1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }
}

impl MySqlStore {
    /// One reservation attempt. `Ok(None)` means the code is already taken.
    ///
    /// The locking read holds the code's index record, or the gap it would
    /// occupy, until commit. Gap locks of different codes may deadlock each
    /// other on insert, so callers retry on SQLSTATE 40001.
    async fn reserve_alias(&self, link: NewLink) -> std::result::Result<Option<Link>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM links WHERE short_code = ? FOR UPDATE")
            .bind(link.short_code.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let link = insert_link(&mut tx, link).await?;
        tx.commit().await?;
        Ok(Some(link))
    }
}

#[async_trait]
impl LinkRepository for MySqlStore {
    async fn insert(&self, link: NewLink) -> Result<Link> {
        let code = link.short_code.as_str().to_owned();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        match insert_link(&mut tx, link).await {
            Ok(link) => {
                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(link)
            }
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(code)),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn insert_alias(&self, link: NewLink) -> Result<Link> {
        let code = link.short_code.as_str().to_owned();

        for attempt in 1..=ALIAS_RESERVATION_ATTEMPTS {
            match self.reserve_alias(link.clone()).await {
                Ok(Some(link)) => return Ok(link),
                Ok(None) => return Err(StorageError::Conflict(code)),
                Err(err) if is_unique_violation(&err) => {
                    debug!(code = %code, "alias reservation lost to a concurrent insert");
                    return Err(StorageError::Conflict(code));
                }
                Err(err) if is_deadlock(&err) && attempt < ALIAS_RESERVATION_ATTEMPTS => {
                    debug!(code = %code, attempt, "alias reservation deadlocked, retrying");
                }
                Err(err) => return Err(map_sqlx_error(err)),
            }
        }

        Err(StorageError::Unavailable(format!(
            "alias reservation for '{code}' kept deadlocking"
        )))
    }

    async fn list_by_owner(&self, owner: OwnerId, page: PageRequest) -> Result<(Vec<Link>, u64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM links WHERE owner_id = ? AND deleted_at IS NULL",
        )
        .bind(owner.0)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM links
            WHERE owner_id = ? AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(owner.0)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let links = rows.iter().map(link_from_row).collect::<Result<Vec<_>>>()?;
        Ok((links, count_to_u64(total)?))
    }

    async fn soft_delete(&self, id: LinkId) -> Result<bool> {
        let now = now_seconds().as_second();

        let result = sqlx::query(
            r#"
            UPDATE links
            SET deleted_at = ?, updated_at = ?
            WHERE id = ?
              AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ClickRepository for MySqlStore {
    async fn record(&self, click: NewClick) -> Result<ClickRecord> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // The increment is evaluated by the database, never read-modify-write.
        let bumped = sqlx::query("UPDATE links SET click_count = click_count + 1 WHERE id = ?")
            .bind(click.link_id.0)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if bumped.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StorageError::NotFound(format!("link {}", click.link_id)));
        }

        let mut click = click;
        click.clicked_at = truncate_to_second(click.clicked_at);

        let inserted = sqlx::query(
            r#"
            INSERT INTO clicks
                (link_id, ip_address, user_agent, browser, browser_version, os, device,
                 country, country_code, city, referer, referer_source, referer_domain, clicked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(click.link_id.0)
        .bind(click.ip_address.as_str())
        .bind(click.user_agent.as_str())
        .bind(click.browser.as_str())
        .bind(click.browser_version.as_str())
        .bind(click.os.as_str())
        .bind(click.device.as_str())
        .bind(click.country.as_str())
        .bind(click.country_code.as_str())
        .bind(click.city.as_str())
        .bind(click.referer.as_str())
        .bind(click.referer_source.as_str())
        .bind(click.referer_domain.as_str())
        .bind(click.clicked_at.as_second())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(ClickRecord::from_new(inserted.last_insert_id(), click))
    }

    async fn list_by_link(&self, link_id: LinkId, page: PageRequest) -> Result<(Vec<ClickRecord>, u64)> {
        let total = self.count_by_link(link_id).await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {CLICK_COLUMNS}
            FROM clicks
            WHERE link_id = ?
            ORDER BY clicked_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(link_id.0)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let clicks = rows.iter().map(click_from_row).collect::<Result<Vec<_>>>()?;
        Ok((clicks, total))
    }

    async fn count_by_link(&self, link_id: LinkId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE link_id = ?")
            .bind(link_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        count_to_u64(count)
    }

    async fn count_by_dimension(
        &self,
        link_id: LinkId,
        dimension: ClickDimension,
        limit: Option<usize>,
    ) -> Result<Vec<(String, u64)>> {
        let column = dimension_column(dimension);
        let mut sql = format!(
            r#"
            SELECT {column} AS value, COUNT(*) AS clicks
            FROM clicks
            WHERE link_id = ? AND {column} <> ''
            GROUP BY {column}
            ORDER BY clicks DESC, value ASC
            "#
        );
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(link_id.0);
        if let Some(limit) = limit {
            query = query.bind(limit as u64);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let value: String = row.try_get("value").map_err(map_sqlx_error)?;
                let clicks: i64 = row.try_get("clicks").map_err(map_sqlx_error)?;
                Ok((value, count_to_u64(clicks)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_columns_are_clicks_columns() {
        for dimension in [
            ClickDimension::Browser,
            ClickDimension::Os,
            ClickDimension::Device,
            ClickDimension::Country,
            ClickDimension::RefererSource,
            ClickDimension::RefererDomain,
        ] {
            assert!(CLICK_COLUMNS.contains(dimension_column(dimension)));
        }
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
    }

    #[test]
    fn timestamps_are_stored_at_second_precision() {
        let ts = Timestamp::from_second(1_700_000_000).unwrap() + jiff::SignedDuration::from_millis(750);
        assert_eq!(truncate_to_second(ts).as_second(), 1_700_000_000);
        assert_eq!(truncate_to_second(ts).subsec_nanosecond(), 0);
    }
}

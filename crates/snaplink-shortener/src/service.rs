use crate::validate::validate_url;
use async_trait::async_trait;
use jiff::Timestamp;
use snaplink_core::ownership::authorize;
use snaplink_core::shortcode::MAX_CODE_LENGTH;
use snaplink_core::{
    AllocateParams, Link, LinkRepository, NewLink, OwnerId, Page, PageRequest, ShortCode, Shortener,
    ShortenerError, StorageError,
};
use snaplink_generator::Generator;
use std::sync::Arc;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, ShortenerError>;

/// Everything about a new link except its code.
#[derive(Debug, Clone)]
struct Draft {
    owner: Option<OwnerId>,
    original_url: String,
    expire_at: Option<Timestamp>,
}

impl Draft {
    fn with_code(&self, short_code: ShortCode) -> NewLink {
        NewLink {
            owner: self.owner,
            short_code,
            original_url: self.original_url.clone(),
            expire_at: self.expire_at,
        }
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// Length of generated codes when the caller does not ask for one.
    #[builder(default = 6)]
    pub default_code_length: usize,
    /// Generated-code inserts tried before giving up.
    #[builder(default = 5)]
    pub max_attempts: usize,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A concrete implementation of the `Shortener` trait.
///
/// Caller-chosen aliases and generated codes take different paths:
/// - aliases go through the store's serialized [`LinkRepository::insert_alias`],
///   so concurrent requests for one alias have exactly one winner;
/// - generated codes are inserted optimistically and regenerated on a
///   unique-key collision, up to `max_attempts` times.
#[derive(Debug, Clone)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    config: ShortenerConfig,
}

impl<R: LinkRepository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G, config: ShortenerConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            config,
        }
    }

    fn code_length(&self, requested: Option<usize>) -> Result<usize> {
        let length = requested.unwrap_or(self.config.default_code_length);
        if !(1..=MAX_CODE_LENGTH).contains(&length) {
            return Err(ShortenerError::InvalidCodeLength {
                length,
                min: 1,
                max: MAX_CODE_LENGTH,
            });
        }
        Ok(length)
    }

    async fn allocate_alias(&self, alias: ShortCode, draft: &Draft) -> Result<Link> {
        match self.repository.insert_alias(draft.with_code(alias)).await {
            Ok(link) => Ok(link),
            Err(StorageError::Conflict(code)) => Err(ShortenerError::AliasAlreadyExists(code)),
            Err(e) => Err(e.into()),
        }
    }

    async fn allocate_generated(&self, length: usize, draft: &Draft) -> Result<Link> {
        for attempt in 1..=self.config.max_attempts {
            let code = self.generator.generate(length);
            if code.is_reserved() {
                debug!(code = %code, attempt, "generated a reserved short code, retrying");
                continue;
            }

            match self.repository.insert(draft.with_code(code)).await {
                Ok(link) => return Ok(link),
                Err(StorageError::Conflict(code)) => {
                    warn!(code = %code, attempt, "generated short code collided, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ShortenerError::AllocationExhausted {
            attempts: self.config.max_attempts,
        })
    }

    /// Looks a code up and admits only its owner.
    async fn owned_link(&self, code: &str, requester: OwnerId) -> Result<Link> {
        let link = match ShortCode::lookup(code) {
            Some(code) => self.repository.get_by_code(&code).await?,
            None => None,
        };
        Ok(authorize(link, requester)?)
    }
}

#[async_trait]
impl<R: LinkRepository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn allocate(&self, params: AllocateParams) -> Result<Link> {
        let original_url = validate_url(&params.original_url)?;

        // An empty alias counts as no alias.
        let alias = params
            .custom_alias
            .filter(|alias| !alias.is_empty())
            .map(ShortCode::alias)
            .transpose()?;

        let expire_at = params
            .expiration
            .expire_at(Timestamp::now())
            .ok_or(ShortenerError::InvalidExpiration)?;

        let draft = Draft {
            owner: params.owner,
            original_url: original_url.into(),
            expire_at,
        };

        let link = match alias {
            Some(alias) => self.allocate_alias(alias, &draft).await?,
            None => {
                let length = self.code_length(params.code_length)?;
                self.allocate_generated(length, &draft).await?
            }
        };

        debug!(code = %link.short_code, id = %link.id, "link allocated");
        Ok(link)
    }

    async fn links_for_owner(&self, owner: OwnerId, page: PageRequest) -> Result<Page<Link>> {
        let (links, total) = self.repository.list_by_owner(owner, page).await?;
        Ok(Page::new(links, total, page))
    }

    async fn link_detail(&self, code: &str, requester: OwnerId) -> Result<Link> {
        self.owned_link(code, requester).await
    }

    async fn delete_link(&self, code: &str, requester: OwnerId) -> Result<()> {
        let link = self.owned_link(code, requester).await?;

        // A concurrent delete may have won; the link is gone either way.
        if !self.repository.soft_delete(link.id).await? {
            return Err(ShortenerError::LinkNotFound);
        }
        debug!(code = %link.short_code, id = %link.id, "link deleted");
        Ok(())
    }
}

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snaplink_core::{AllocateParams, ExpirationPolicy, Link, OwnerId, PageRequest};

use crate::error::AppError;

const SECONDS_PER_HOUR: u64 = 60 * 60;

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Lifetime in hours.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expire_at: Option<Timestamp>,
    #[serde(default)]
    pub code_length: Option<usize>,
}

impl CreateLinkRequest {
    pub fn into_params(self, owner: Option<OwnerId>) -> Result<AllocateParams, AppError> {
        let expiration = match (self.expires_in, self.expire_at) {
            (Some(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "expires_in and expire_at are mutually exclusive".to_string(),
                ))
            }
            (Some(hours), None) => {
                let seconds = hours
                    .checked_mul(SECONDS_PER_HOUR)
                    .ok_or_else(|| AppError::BadRequest("expires_in is out of range".to_string()))?;
                ExpirationPolicy::AfterDuration(Duration::from_secs(seconds))
            }
            (None, Some(at)) => ExpirationPolicy::AtTimestamp(at),
            (None, None) => ExpirationPolicy::Never,
        };

        Ok(AllocateParams::builder()
            .original_url(self.url)
            .custom_alias(self.alias)
            .owner(owner)
            .expiration(expiration)
            .code_length(self.code_length)
            .build())
    }
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: u64,
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub click_count: u64,
    pub expire_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl LinkResponse {
    pub fn from_link(link: Link, base_url: &str) -> Self {
        Self {
            id: link.id.0,
            short_url: link.short_code.to_url(base_url),
            custom_alias: link.custom_alias().map(str::to_string),
            short_code: link.short_code.as_str().to_string(),
            original_url: link.original_url,
            click_count: link.click_count,
            expire_at: link.expire_at,
            created_at: link.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListQuery {
    pub fn to_request(&self, default_page_size: u32) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(default_page_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreateLinkRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn hours_become_a_relative_expiry() {
        let params = request(r#"{"url":"https://example.com","expires_in":2}"#)
            .into_params(None)
            .unwrap();
        assert_eq!(
            params.expiration,
            ExpirationPolicy::AfterDuration(Duration::from_secs(7200))
        );
        assert_eq!(params.custom_alias, None);
    }

    #[test]
    fn both_expiry_forms_are_rejected() {
        let err = request(
            r#"{"url":"https://example.com","expires_in":2,"expire_at":"2030-01-01T00:00:00Z"}"#,
        )
        .into_params(None)
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn list_query_defaults() {
        let req = ListQuery::default().to_request(10);
        assert_eq!((req.page(), req.page_size()), (1, 10));
    }
}

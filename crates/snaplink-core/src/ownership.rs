//! The ownership gate shared by link detail, deletion and analytics.

use crate::error::AccessError;
use crate::link::{Link, OwnerId};

/// Admits `requester` to a looked-up link.
///
/// A missing (or soft-deleted, hence missing) link is reported before the
/// ownership test. Anonymous links have no owner and admit nobody.
pub fn authorize(link: Option<Link>, requester: OwnerId) -> Result<Link, AccessError> {
    let link = link.ok_or(AccessError::LinkNotFound)?;
    if !link.is_owned_by(requester) {
        return Err(AccessError::Unauthorized);
    }
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{LinkId, NewLink};
    use crate::shortcode::ShortCode;
    use jiff::Timestamp;

    fn link(owner: Option<OwnerId>) -> Link {
        NewLink {
            owner,
            short_code: ShortCode::generated("abc123"),
            original_url: "https://example.com".to_string(),
            expire_at: None,
        }
        .into_link(LinkId(1), Timestamp::now())
    }

    #[test]
    fn owner_is_admitted() {
        let got = authorize(Some(link(Some(OwnerId(1)))), OwnerId(1)).unwrap();
        assert_eq!(got.id, LinkId(1));
    }

    #[test]
    fn other_identity_is_rejected() {
        let err = authorize(Some(link(Some(OwnerId(1)))), OwnerId(2)).unwrap_err();
        assert_eq!(err, AccessError::Unauthorized);
    }

    #[test]
    fn anonymous_link_admits_nobody() {
        let err = authorize(Some(link(None)), OwnerId(1)).unwrap_err();
        assert_eq!(err, AccessError::Unauthorized);
    }

    #[test]
    fn missing_link_is_not_found() {
        let err = authorize(None, OwnerId(1)).unwrap_err();
        assert_eq!(err, AccessError::LinkNotFound);
    }
}

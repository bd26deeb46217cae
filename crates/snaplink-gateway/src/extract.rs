use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{REFERER, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use snaplink_core::{ClickInfo, OwnerId};

use crate::error::AppError;

/// Header carrying the pre-authenticated caller identity.
pub const OWNER_ID_HEADER: &str = "x-owner-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

fn owner_from_headers(headers: &HeaderMap) -> Result<Option<OwnerId>, AppError> {
    let Some(value) = headers.get(OWNER_ID_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|id| Some(OwnerId(id)))
        .ok_or(AppError::MissingIdentity)
}

/// The identity a request acts as. Rejects with 401 when absent.
pub struct Requester(pub OwnerId);

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        owner_from_headers(&parts.headers)?
            .map(Requester)
            .ok_or(AppError::MissingIdentity)
    }
}

/// Like [`Requester`], but anonymous requests are let through.
pub struct MaybeRequester(pub Option<OwnerId>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeRequester {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        owner_from_headers(&parts.headers).map(MaybeRequester)
    }
}

fn header_str(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Raw click metadata of the current request.
///
/// The client address is the first `X-Forwarded-For` hop when present,
/// otherwise the socket peer.
pub struct ClientMeta(pub ClickInfo);

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip_address = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_default();

        Ok(ClientMeta(ClickInfo {
            ip_address,
            user_agent: header_str(&parts.headers, USER_AGENT),
            referer: header_str(&parts.headers, REFERER),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn client_meta(request: Request<()>) -> ClickInfo {
        let (mut parts, _) = request.into_parts();
        let ClientMeta(info) = ClientMeta::from_request_parts(&mut parts, &()).await.unwrap();
        info
    }

    #[tokio::test]
    async fn forwarded_for_wins_over_peer() {
        let mut request = Request::builder()
            .header(FORWARDED_FOR_HEADER, "203.0.113.5, 10.0.0.1")
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 9], 4000))));

        let info = client_meta(request).await;
        assert_eq!(info.ip_address, "203.0.113.5");
        assert_eq!(info.user_agent, "curl/8.0");
        assert_eq!(info.referer, "");
    }

    #[tokio::test]
    async fn falls_back_to_socket_peer() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 7], 4000))));

        assert_eq!(client_meta(request).await.ip_address, "198.51.100.7");
    }

    #[tokio::test]
    async fn owner_header_must_be_numeric() {
        let request = Request::builder()
            .header(OWNER_ID_HEADER, "alice")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        assert!(Requester::from_request_parts(&mut parts, &()).await.is_err());
        assert!(MaybeRequester::from_request_parts(&mut parts, &()).await.is_err());

        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let MaybeRequester(owner) = MaybeRequester::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(owner, None);
    }
}

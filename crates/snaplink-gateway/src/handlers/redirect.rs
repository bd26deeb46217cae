use crate::error::Result;
use crate::extract::ClientMeta;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Sends the client to the link's destination with a 302, so repeat
/// visits keep reaching the resolver.
pub async fn redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    ClientMeta(info): ClientMeta,
) -> Result<Response> {
    let url = state.redirector.resolve(&short_code, info).await?;
    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

use crate::error::Result;
use crate::extract::{MaybeRequester, Requester};
use crate::model::{CreateLinkRequest, LinkResponse, ListQuery};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snaplink_core::Page;
use tracing::info;

const DEFAULT_LINKS_PAGE_SIZE: u32 = 10;

pub async fn create_link_handler(
    State(state): State<AppState>,
    MaybeRequester(owner): MaybeRequester,
    Json(request): Json<CreateLinkRequest>,
) -> Result<Response> {
    let params = request.into_params(owner)?;
    let link = state.shortener.allocate(params).await?;
    info!(short_code = %link.short_code, link_id = %link.id, "link created");

    let body = LinkResponse::from_link(link, state.base_url());
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn list_links_handler(
    State(state): State<AppState>,
    Requester(owner): Requester,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<LinkResponse>>> {
    let page = state
        .shortener
        .links_for_owner(owner, query.to_request(DEFAULT_LINKS_PAGE_SIZE))
        .await?;

    Ok(Json(Page {
        items: page
            .items
            .into_iter()
            .map(|link| LinkResponse::from_link(link, state.base_url()))
            .collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

pub async fn get_link_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    Requester(owner): Requester,
) -> Result<Json<LinkResponse>> {
    let link = state.shortener.link_detail(&short_code, owner).await?;
    Ok(Json(LinkResponse::from_link(link, state.base_url())))
}

pub async fn delete_link_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    Requester(owner): Requester,
) -> Result<StatusCode> {
    state.shortener.delete_link(&short_code, owner).await?;
    info!(short_code = %short_code, "link deleted");
    Ok(StatusCode::NO_CONTENT)
}

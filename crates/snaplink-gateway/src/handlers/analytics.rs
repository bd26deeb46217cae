use crate::error::Result;
use crate::extract::Requester;
use crate::model::{AnalyticsResponse, ListQuery};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use snaplink_core::{ClickRecord, Page};

const DEFAULT_CLICKS_PAGE_SIZE: u32 = 20;

pub async fn link_analytics_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    Requester(owner): Requester,
) -> Result<Json<AnalyticsResponse>> {
    let link = state.shortener.link_detail(&short_code, owner).await?;
    let summary = state.analytics.summary(link.id, owner).await?;
    Ok(Json(AnalyticsResponse::new(link.short_code.as_str(), summary)))
}

pub async fn link_clicks_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    Requester(owner): Requester,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<ClickRecord>>> {
    let link = state.shortener.link_detail(&short_code, owner).await?;
    let page = state
        .analytics
        .clicks(link.id, owner, query.to_request(DEFAULT_CLICKS_PAGE_SIZE))
        .await?;
    Ok(Json(page))
}

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_link_handler, delete_link_handler, get_link_handler, health_handler, link_analytics_handler,
    link_clicks_handler, list_links_handler, redirect_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/{code}", get(redirect_handler))
            .nest(
                "/v1/links",
                Router::new()
                    .route("/", get(list_links_handler).post(create_link_handler))
                    .route("/{code}", get(get_link_handler).delete(delete_link_handler))
                    .route("/{code}/analytics", get(link_analytics_handler))
                    .route("/{code}/clicks", get(link_clicks_handler)),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

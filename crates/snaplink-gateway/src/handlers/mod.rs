mod analytics;
mod health;
mod link;
mod redirect;

pub use analytics::{link_analytics_handler, link_clicks_handler};
pub use health::health_handler;
pub use link::{create_link_handler, delete_link_handler, get_link_handler, list_links_handler};
pub use redirect::redirect_handler;

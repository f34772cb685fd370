pub mod dto;
pub mod handlers;
pub mod repo_types;
pub mod usda;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::lookup_routes())
        .merge(handlers::custom_routes())
}

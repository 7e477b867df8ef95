pub mod handlers;
pub mod models;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;

/// SCIM group and membership routes
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/Groups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route(
            "/Groups/{id}",
            get(handlers::get_group)
                .put(handlers::update_group)
                .delete(handlers::delete_group),
        )
        .route(
            "/Groups/{id}/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/Groups/{id}/members/{member_id}",
            get(handlers::get_member).delete(handlers::remove_member),
        )
}

pub mod handlers;
pub mod models;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;

/// Client registration routes
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/oauth/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route(
            "/oauth/clients/{id}",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
}

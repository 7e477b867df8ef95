pub mod handlers;
pub mod models;

use crate::api::authn_middleware::{dual_path_middleware, DualPath};
use crate::state::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, put};
use axum::Router;
use uaa_core::Token;

/// SCIM user routes. Reading a single user goes through the dual-path check,
/// which needs its own handle on the state.
pub(super) fn router(state: &AppState) -> Router<AppState> {
    let read_policy = DualPath {
        client: Token::requirement()
            .with_audiences(["scim"])
            .with_authorities(["scim.read"]),
        user: Token::requirement()
            .with_audiences(["scim"])
            .with_scopes(["scim.me"]),
    };

    Router::new()
        .route(
            "/Users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/Users/{id}",
            // route_layer only wraps the methods registered before it
            get(handlers::get_user)
                .route_layer(from_fn_with_state(
                    (state.clone(), read_policy),
                    dual_path_middleware,
                ))
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/Users/{id}/password", put(handlers::change_password))
}

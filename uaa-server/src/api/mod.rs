pub(crate) mod authn_middleware;
pub(crate) mod clients;
pub(crate) mod groups;
pub(crate) mod health;
pub(crate) mod oauth;
pub(crate) mod scim;
pub(crate) mod users;

use crate::state::AppState;
use axum::Router;

/// Combines all API routes into a single router.
///
/// Every resource handler authorizes its own request, so only
/// `GET /Users/{id}` carries a middleware layer.
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(oauth::router())
        .merge(clients::router())
        .merge(users::router(state))
        .merge(groups::router())
}

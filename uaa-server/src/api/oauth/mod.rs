//! OAuth 2.0 token issuance and verification key publication
//!
//! ## Supported flows
//! - Client Credentials Grant (RFC 6749 Section 4.4)
//! - Resource Owner Password Credentials Grant (RFC 6749 Section 4.3)
//! - Implicit style authorization for JSON clients, answered with a
//!   redirect carrying the token in the URI fragment
//!
//! Tokens are RS256 JWTs signed by the server's key, which is published at
//! `/token_key` and `/token_keys`.

pub mod handlers;
pub mod models;

use crate::state::AppState;
use axum::routing::{get, post, Router};

/// Creates OAuth 2.0 routes
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/oauth/token", post(handlers::issue_token))
        .route("/oauth/authorize", post(handlers::authorize))
        .route("/token_key", get(handlers::token_key))
        .route("/token_keys", get(handlers::token_keys))
}

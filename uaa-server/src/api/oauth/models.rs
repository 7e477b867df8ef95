//! OAuth 2.0 request and response documents

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Form body of `POST /oauth/token`
#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct TokenRequest {
    /// `client_credentials` (default) or `password`
    pub grant_type: Option<String>,
    /// Client identifier, defaults to the Basic auth username
    pub client_id: Option<String>,
    /// Resource owner name (password grant)
    pub username: Option<String>,
    /// Resource owner password (password grant)
    pub password: Option<String>,
    /// Optional space-separated subset of the client's scopes
    pub scope: Option<String>,
}

/// OAuth 2.0 Token Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// The signed access token
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    /// Granted scopes (space-separated)
    pub scope: String,
}

/// Form body of `POST /oauth/authorize`
#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub client_id: String,
    /// Must be "token"
    #[serde(default)]
    pub response_type: String,
    /// Falls back to the client's first registered redirect URI
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Requested scopes (space-separated)
    pub scope: Option<String>,
    /// Echoed back in the redirect fragment
    pub state: Option<String>,
}

//! OAuth 2.0 endpoint handlers

use crate::api::oauth::models::{AuthorizeRequest, TokenRequest, TokenResponse};
use crate::errors::{ApiError, ErrorBody};
use crate::headers::{accepts_json, basic_credentials};
use crate::openapi::OAUTH_TAG;
use crate::state::AppState;
use axum::{
    extract::{rejection::FormRejection, Form, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http::HeaderMap;
use log::{debug, error, info, warn};
use serde_json::json;
use uaa_core::models::{Client, GRANT_CLIENT_CREDENTIALS, GRANT_PASSWORD};
use uaa_core::{Token, TokenKey, TokenKeys};
use url::{form_urlencoded, Url};

fn invalid_client<D: ToString>(description: D) -> ApiError {
    ApiError::new("invalid_client", description, StatusCode::UNAUTHORIZED)
}

fn bad_credentials() -> ApiError {
    ApiError::unauthorized("Bad credentials")
}

fn split_scopes(scope: Option<&str>) -> Vec<String> {
    scope
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn sign(state: &AppState, token: &Token) -> Result<String, ApiError> {
    state.codec().encode(token).map_err(|e| {
        error!("Failed to sign access token: {e}");
        ApiError::internal("Failed to sign access token")
    })
}

/// OAuth 2.0 Token endpoint
///
/// Issues client tokens for the `client_credentials` grant and user tokens
/// for the `password` grant. HTTP Basic credentials must be present; they
/// are only compared with the client's secret when `verify_client_secret`
/// is enabled.
#[utoipa::path(
    post,
    path = "/oauth/token",
    tag = OAUTH_TAG,
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 400, description = "Invalid request or grant type", body = ErrorBody),
        (status = 401, description = "Missing credentials or unknown client", body = ErrorBody)
    )
)]
pub(crate) async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some((basic_user, basic_secret)) = basic_credentials(&headers) else {
        warn!("Token request without Basic credentials");
        return Err(ApiError::unauthorized(
            "Full authentication is required to access this resource",
        ));
    };
    let Form(request) =
        form.map_err(|e| ApiError::bad_request("invalid_request", e.body_text()))?;

    let grant_type = request
        .grant_type
        .as_deref()
        .filter(|g| !g.is_empty())
        .unwrap_or(GRANT_CLIENT_CREDENTIALS);
    if grant_type != GRANT_CLIENT_CREDENTIALS && grant_type != GRANT_PASSWORD {
        warn!("Unsupported grant type '{grant_type}'");
        return Err(ApiError::bad_request(
            "unsupported_grant_type",
            format!("Unsupported grant type: {grant_type}"),
        ));
    }

    let client_id = request
        .client_id
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| basic_user.clone());
    let client = state.clients.get(&client_id).ok_or_else(|| {
        warn!("Token requested for unknown client '{client_id}'");
        invalid_client(format!("No client with requested id: {client_id}"))
    })?;

    if state.settings.token.verify_client_secret
        && (basic_user != client.id || basic_secret != client.secret)
    {
        warn!("Client secret mismatch for client '{}'", client.id);
        return Err(invalid_client("Bad client credentials"));
    }

    if !client.has_grant_type(grant_type) {
        warn!("Client '{}' is not authorized for {grant_type}", client.id);
        return Err(ApiError::bad_request(
            "unauthorized_client",
            format!("Unauthorized grant type: {grant_type}"),
        ));
    }

    let mut token = match grant_type {
        GRANT_PASSWORD => password_grant_token(&state, &client, &request)?,
        _ => state.client_token(&client),
    };

    // a requested scope narrows the grant, it never widens it
    let requested = split_scopes(request.scope.as_deref());
    if !requested.is_empty() {
        token.scopes.retain(|scope| requested.contains(scope));
    }

    let access_token = sign(&state, &token)?;
    info!(
        "Issued {grant_type} token to client '{}' with {} scopes",
        client.id,
        token.scopes.len()
    );

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.token_validity(&client),
        scope: token.scopes.join(" "),
    }))
}

fn password_grant_token(
    state: &AppState,
    client: &Client,
    request: &TokenRequest,
) -> Result<Token, ApiError> {
    let username = request.username.as_deref().unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();

    let user = state
        .users
        .get_by_name(username)
        .filter(|user| user.active && user.password_matches(password))
        .ok_or_else(|| {
            warn!("Password grant rejected for user '{username}'");
            bad_credentials()
        })?;
    Ok(state.user_token(&user, client.scope.clone()))
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// Implicit style authorization for JSON clients
///
/// On auto-approval, redirects to the client's redirect URI with the token
/// in the fragment. Answers an empty object when the scopes still need
/// approval, and redirects to the login page on any failed precondition.
#[utoipa::path(
    post,
    path = "/oauth/authorize",
    tag = OAUTH_TAG,
    request_body(content = AuthorizeRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Approval required"),
        (status = 302, description = "Redirect with the token fragment, or to the login page")
    )
)]
pub(crate) async fn authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<AuthorizeRequest>, FormRejection>,
) -> Response {
    match authorize_redirect(&state, &headers, form) {
        Ok(response) => response,
        Err(reason) => {
            warn!("Authorization failed, redirecting to login: {reason}");
            found(&state.settings.login_url())
        }
    }
}

fn authorize_redirect(
    state: &AppState,
    headers: &HeaderMap,
    form: Result<Form<AuthorizeRequest>, FormRejection>,
) -> Result<Response, String> {
    if !accepts_json(headers) {
        return Err("Accept must include application/json".to_string());
    }
    let Form(request) = form.map_err(|e| e.body_text())?;
    if request.response_type != "token" {
        return Err(format!("unsupported response_type '{}'", request.response_type));
    }

    let client = state
        .clients
        .get(&request.client_id)
        .ok_or_else(|| format!("unknown client '{}'", request.client_id))?;
    let user = state
        .users
        .get_by_name(&request.username)
        .filter(|user| user.active && user.password_matches(&request.password))
        .ok_or_else(|| format!("bad credentials for user '{}'", request.username))?;

    let mut scopes = split_scopes(request.scope.as_deref());
    if scopes.is_empty() {
        scopes = client.scope.clone();
    }
    let default_scopes = state.settings.token.get_default_scopes();
    scopes.retain(|scope| default_scopes.contains(scope));

    let redirect_uri = request
        .redirect_uri
        .clone()
        .filter(|uri| !uri.is_empty())
        .or_else(|| client.redirect_uri.first().cloned())
        .ok_or_else(|| format!("no redirect_uri for client '{}'", client.id))?;
    let mut target =
        Url::parse(&redirect_uri).map_err(|e| format!("invalid redirect_uri: {e}"))?;

    if !client.autoapproves(&scopes) {
        debug!("Scopes {scopes:?} need approval for client '{}'", client.id);
        return Ok((StatusCode::OK, Json(json!({}))).into_response());
    }

    let token = state.user_token(&user, scopes);
    let access_token = match sign(state, &token) {
        Ok(signed) => signed,
        Err(e) => return Ok(e.into_response()),
    };

    let mut fragment = form_urlencoded::Serializer::new(String::new());
    fragment
        .append_pair("access_token", &access_token)
        .append_pair("token_type", "bearer")
        .append_pair("expires_in", &state.token_validity(&client).to_string())
        .append_pair("scope", &token.scopes.join(" "));
    if let Some(state_param) = request.state.as_deref() {
        fragment.append_pair("state", state_param);
    }
    target.set_fragment(Some(&fragment.finish()));

    info!(
        "Authorized user '{}' for client '{}'",
        user.user_name, client.id
    );
    Ok(found(target.as_str()))
}

/// Get the public key used to verify access tokens
#[utoipa::path(
    get,
    path = "/token_key",
    tag = OAUTH_TAG,
    responses((status = 200, description = "Verification key", body = TokenKey))
)]
pub(crate) async fn token_key(State(state): State<AppState>) -> Json<TokenKey> {
    Json(state.codec().keys().token_key())
}

/// Get all verification keys as a key set
#[utoipa::path(
    get,
    path = "/token_keys",
    tag = OAUTH_TAG,
    responses((status = 200, description = "Verification key set", body = TokenKeys))
)]
pub(crate) async fn token_keys(State(state): State<AppState>) -> Json<TokenKeys> {
    Json(TokenKeys {
        keys: vec![state.codec().keys().token_key()],
    })
}

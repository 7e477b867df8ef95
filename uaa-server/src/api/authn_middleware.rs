use crate::errors::ApiError;
use crate::headers::bearer_token;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::HeaderMap;
use log::warn;
use uaa_core::Token;

/// Decodes the bearer token without checking any capability
pub(crate) fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Token, ApiError> {
    let Some(signed) = bearer_token(headers) else {
        warn!("Missing bearer token");
        return Err(ApiError::unauthorized(
            "Full authentication is required to access this resource",
        ));
    };

    state.codec().decode(signed).map_err(|_| {
        warn!("Rejected undecodable access token");
        ApiError::unauthorized("Invalid access token")
    })
}

/// Authenticates the request and checks that the token carries at least
/// the required audiences, scopes and authorities
pub(crate) fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    required: &Token,
) -> Result<Token, ApiError> {
    let token = authenticate(state, headers)?;
    if !token.satisfies(required) {
        warn!(
            "Insufficient capabilities for {}: requires audiences {:?}, scopes {:?}, authorities {:?}",
            token
                .client_id
                .as_deref()
                .or(token.user_id.as_deref())
                .unwrap_or("<anonymous>"),
            required.audiences,
            required.scopes,
            required.authorities,
        );
        return Err(ApiError::unauthorized(
            "Insufficient scope for this resource",
        ));
    }
    Ok(token)
}

/// Requirements applied by [`dual_path_middleware`]
#[derive(Debug, Clone)]
pub(crate) struct DualPath {
    /// Required of tokens issued to a client acting for itself
    pub client: Token,
    /// Required of user tokens, once the user matches the target resource
    pub user: Token,
}

/// Routes a request to the client or user authorization check.
///
/// A token with a `user_id` claim may only reach the resource named by the
/// last path segment; any other token is checked as a client token.
pub(crate) async fn dual_path_middleware(
    State((state, policy)): State<(AppState, DualPath)>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match authenticate(&state, request.headers()) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let required = match token.user_id.as_deref() {
        Some(user_id) => {
            let target = request
                .uri()
                .path()
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default();
            if user_id != target {
                warn!("User {user_id} attempted to access resource {target}");
                return ApiError::forbidden("Access is denied").into_response();
            }
            &policy.user
        }
        None => &policy.client,
    };

    if !token.satisfies(required) {
        warn!("Insufficient capabilities on {}", request.uri().path());
        return ApiError::unauthorized("Insufficient scope for this resource").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Helper function to set up a mock app behind the dual-path middleware
    fn setup_dual_path_mock_app() -> (Router, AppState) {
        let state = AppState::for_testing(&Settings::for_testing());
        let policy = DualPath {
            client: Token::requirement()
                .with_audiences(["scim"])
                .with_authorities(["scim.read"]),
            user: Token::requirement()
                .with_audiences(["scim"])
                .with_scopes(["scim.me"]),
        };

        let app = Router::new()
            .route(
                "/Users/{id}",
                get(async || (StatusCode::OK, "Authenticated")),
            )
            .layer(axum::middleware::from_fn_with_state(
                (state.clone(), policy),
                dual_path_middleware,
            ))
            .with_state(state.clone());
        (app, state)
    }

    /// Helper function to build a request with an optional authorization header
    async fn send_request(app: &Router, uri: &str, auth_header: Option<&str>) -> (StatusCode, String) {
        let mut request_builder = Request::builder().uri(uri);

        if let Some(auth) = auth_header {
            request_builder = request_builder.header("Authorization", auth);
        }

        let request = request_builder
            .body(Body::empty())
            .expect("Failed to build request");

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        let body = String::from_utf8(body_bytes.to_vec())
            .expect("Failed to convert response body to string");

        (status, body)
    }

    fn bearer(state: &AppState, token: &Token) -> String {
        format!("Bearer {}", state.codec().encode(token).unwrap())
    }

    #[tokio::test]
    async fn test_client_token_with_authority() {
        let (app, state) = setup_dual_path_mock_app();
        let token = Token::for_client("c1")
            .with_audiences(["scim"])
            .with_authorities(["scim.read"]);

        let (status, body) = send_request(&app, "/Users/u1", Some(&bearer(&state, &token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Authenticated");
    }

    #[tokio::test]
    async fn test_client_token_without_authority() {
        let (app, state) = setup_dual_path_mock_app();
        let token = Token::for_client("c1").with_audiences(["scim"]);

        let (status, body) = send_request(&app, "/Users/u1", Some(&bearer(&state, &token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("\"error\":\"unauthorized\""));
    }

    #[tokio::test]
    async fn test_user_token_for_own_resource() {
        let (app, state) = setup_dual_path_mock_app();
        let token = Token::for_user("u1")
            .with_audiences(["scim"])
            .with_scopes(["scim.me"]);

        let (status, _) = send_request(&app, "/Users/u1", Some(&bearer(&state, &token))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_user_token_for_other_resource() {
        let (app, state) = setup_dual_path_mock_app();
        // carries client capabilities too, the subject check must still win
        let token = Token::for_user("u1")
            .with_audiences(["scim"])
            .with_scopes(["scim.me"])
            .with_authorities(["scim.read"]);

        let (status, body) = send_request(&app, "/Users/u2", Some(&bearer(&state, &token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("\"error\":\"access_denied\""));
    }

    #[tokio::test]
    async fn test_user_token_without_scope() {
        let (app, state) = setup_dual_path_mock_app();
        let token = Token::for_user("u1").with_audiences(["scim"]);

        let (status, _) = send_request(&app, "/Users/u1", Some(&bearer(&state, &token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_token() {
        let (app, _) = setup_dual_path_mock_app();

        let (status, _) = send_request(&app, "/Users/u1", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send_request(&app, "/Users/u1", Some("Bearer not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send_request(&app, "/Users/u1", Some("Basic YWRtaW46YWRtaW4=")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_authorize_helper() {
        let state = AppState::for_testing(&Settings::for_testing());
        let mut headers = HeaderMap::new();
        let token = Token::for_client("c1").with_scopes(["scim.write"]);
        headers.insert(
            http::header::AUTHORIZATION,
            bearer(&state, &token).parse().unwrap(),
        );

        let required = Token::requirement().with_scopes(["scim.write"]);
        assert_eq!(authorize(&state, &headers, &required).unwrap(), token);

        let stricter = Token::requirement().with_audiences(["scim"]);
        let err = authorize(&state, &headers, &stricter).unwrap_err();
        assert_eq!(err.status_code, StatusCode::UNAUTHORIZED);
        assert_eq!(err.error, "unauthorized");
    }
}

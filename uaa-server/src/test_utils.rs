use crate::config::Settings;
use crate::create_app;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tower::ServiceExt;
use uaa_core::Token;

/// Test fixture for driving the whole application in-process.
///
/// The fixture owns the router and a handle to the shared state, so tests
/// can seed stores directly and mint tokens with the server's own key.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new();
///     let token = fixture.admin_token();
///
///     let response = fixture.get("/oauth/clients/admin", &token).await;
///     response.assert_ok();
///     assert_eq!(response.json["client_id"], "admin");
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Shared state behind the router
    pub state: AppState,
    /// Configuration settings
    pub settings: Settings,
}

impl TestFixture {
    /// Creates a fixture with test settings and freshly seeded stores
    pub fn new() -> Self {
        Self::with_settings(Settings::for_testing())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let state = AppState::for_testing(&settings);
        let app = create_app(state.clone());

        Self {
            app,
            state,
            settings,
        }
    }

    /// Initializes the test logger with customized settings.
    ///
    /// Called by [`TestFixture::new`] with debug level; the first call wins.
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Signs an arbitrary token with the server's key
    pub fn sign(&self, token: &Token) -> String {
        self.state.codec().encode(token).expect("Failed to sign token")
    }

    /// A token for the seeded admin client, as /oauth/token would issue it
    pub fn admin_token(&self) -> String {
        let admin = self.state.clients.get("admin").expect("admin client is seeded");
        self.sign(&self.state.client_token(&admin))
    }

    /// Creates a request builder with a bearer token and a JSON content type
    pub fn request_builder(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        token: &str,
    ) -> http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri.as_ref());

        if !token.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.header("Content-Type", "application/json")
    }

    /// Sends a GET request; an empty token sends no Authorization header
    pub async fn get(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri, token)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a POST request with a JSON body
    pub async fn post<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
        token: &str,
    ) -> TestResponse {
        self.send_json(Method::POST, uri, body, token, &[]).await
    }

    /// Sends a PUT request with a JSON body and extra headers (e.g. If-Match)
    pub async fn put_with_headers<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
        token: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        self.send_json(Method::PUT, uri, body, token, headers).await
    }

    pub async fn delete(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::DELETE, uri, token)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a form encoded POST with the given headers and no bearer token
    pub async fn post_form(
        &self,
        uri: impl AsRef<str>,
        form: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri.as_ref())
            .header("Content-Type", "application/x-www-form-urlencoded");

        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(Body::from(form.to_string()))
            .expect("Failed to build request");

        self.send(request).await
    }

    async fn send_json<T: Serialize>(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        body: &T,
        token: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let mut builder = self.request_builder(method, uri, token);

        // Add custom headers
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and returns a TestResponse.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Try to parse as JSON, defaulting to null if parsing fails or empty body
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }
}

/// Response from a test request that provides convenient access to status,
/// headers and JSON body.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as JSON (null if absent or not JSON)
    pub json: Value,
}

impl TestResponse {
    /// Asserts that the response has the expected status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match the expected value.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    /// Asserts that the response status is OK (200).
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Asserts an error response with the given status and error code
    pub fn assert_error(&self, status: StatusCode, error: &str) -> &Self {
        self.assert_status(status);
        assert_eq!(self.json["error"], error, "body: {}", self.json);
        self
    }

    /// Returns a response header as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Converts the response body to the specified type.
    ///
    /// # Panics
    ///
    /// Panics if deserialization fails.
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}

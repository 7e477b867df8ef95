use super::models::{
    GroupRef, PasswordChange, PasswordChangeResponse, UserDocument, UserRequest,
};
use crate::api::authn_middleware::{authenticate, authorize};
use crate::api::scim::{
    decode_json, required_version, sort_resources, Filter, ScimList, SortOrder,
};
use crate::errors::{ApiError, ErrorBody};
use crate::headers::etag;
use crate::openapi::USERS_TAG;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::ETAG, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use http::HeaderMap;
use log::{info, warn};
use serde::Deserialize;
use uaa_core::models::User;
use uaa_core::{Resource, StoreError, Token};
use utoipa::IntoParams;

const USER_FILTERS: [&str; 2] = ["id", "userName"];

fn user_sort_orders() -> [(&'static str, SortOrder<User>); 3] {
    [
        ("created", |a, b| a.created.cmp(&b.created)),
        ("id", |a, b| a.id.cmp(&b.id)),
        ("userName", |a, b| {
            a.user_name.cmp(&b.user_name).then_with(|| a.id.cmp(&b.id))
        }),
    ]
}

fn scim_write_authority() -> Token {
    Token::requirement()
        .with_audiences(["scim"])
        .with_authorities(["scim.write"])
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(id) => ApiError::not_found(
            "scim_resource_not_found",
            format!("User {id} does not exist"),
        ),
        StoreError::Conflict(user_name) => {
            warn!("Username already in use: {user_name}");
            ApiError::conflict(
                "scim_resource_already_exists",
                format!("Username already in use: {user_name}"),
            )
        }
        StoreError::VersionMismatch { expected, actual } => {
            warn!("User version mismatch: expected {expected}, stored {actual}");
            ApiError::bad_request(
                "invalid_version",
                format!("Version mismatch: If-Match {expected}, current version {actual}"),
            )
        }
    }
}

/// Renders a user with the groups that list it as a member
fn user_document(state: &AppState, user: User) -> UserDocument {
    let groups = state
        .groups
        .all()
        .iter()
        .filter(|group| group.member(&user.id).is_some())
        .map(GroupRef::direct)
        .collect();
    UserDocument::new(user, groups)
}

fn user_response(state: &AppState, status: StatusCode, user: User) -> Response {
    (
        status,
        [(ETAG, etag(user.version))],
        Json(user_document(state, user)),
    )
        .into_response()
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct ListUsersQuery {
    /// `id` or `userName` compared with `eq`
    pub filter: Option<String>,
    /// `created` (default), `id` or `userName`
    pub sort_by: Option<String>,
}

/// Create a user
#[utoipa::path(
    post,
    path = "/Users",
    tag = USERS_TAG,
    request_body = UserRequest,
    responses(
        (status = 201, description = "User created", body = UserDocument),
        (status = 400, description = "Invalid user", body = ErrorBody),
        (status = 401, description = "Missing scim.write scope", body = ErrorBody),
        (status = 409, description = "Username already in use", body = ErrorBody)
    )
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let required = Token::requirement()
        .with_audiences(["scim"])
        .with_scopes(["scim.write"]);
    authorize(&state, &headers, &required)?;
    let request: UserRequest = decode_json(&headers, &body)?;

    let user = request.into_user();
    user.validate()
        .map_err(|e| ApiError::bad_request("invalid_user", e))?;

    let user = state.users.create(user).map_err(store_error)?;
    info!("Created user {} ({})", user.user_name, user.id);
    Ok(user_response(&state, StatusCode::CREATED, user))
}

/// Fetch a user. Client tokens need `scim.read`; user tokens may only read
/// their own record and need `scim.me`.
#[utoipa::path(
    get,
    path = "/Users/{id}",
    tag = USERS_TAG,
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User found", body = UserDocument),
        (status = 401, description = "Insufficient scope", body = ErrorBody),
        (status = 403, description = "User token for another user", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user = state
        .users
        .get(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    Ok(user_response(&state, StatusCode::OK, user))
}

/// Search users. A filter is mandatory.
#[utoipa::path(
    get,
    path = "/Users",
    tag = USERS_TAG,
    params(ListUsersQuery),
    responses(
        (status = 200, description = "SCIM list of users", body = ScimList<UserDocument>),
        (status = 400, description = "Missing or invalid filter", body = ErrorBody)
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ScimList<UserDocument>>, ApiError> {
    let expression = query
        .filter
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("invalid_filter", "A filter is required"))?;
    let filter = Filter::parse(expression, &USER_FILTERS)?;

    let mut users = state.users.all();
    users.retain(|user| match filter.attribute {
        "id" => user.id == filter.value,
        _ => user.name_matches(&filter.value),
    });
    sort_resources(&mut users, query.sort_by.as_deref(), &user_sort_orders())?;

    let documents = users
        .into_iter()
        .map(|user| user_document(&state, user))
        .collect();
    Ok(Json(ScimList::new(documents)))
}

/// Replace a user
#[utoipa::path(
    put,
    path = "/Users/{id}",
    tag = USERS_TAG,
    request_body = UserRequest,
    params(
        ("id" = String, Path, description = "User identifier"),
        ("If-Match" = String, Header, description = "Expected user version")
    ),
    responses(
        (status = 200, description = "User updated", body = UserDocument),
        (status = 400, description = "Invalid user or version", body = ErrorBody),
        (status = 401, description = "Missing scim.write authority", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 409, description = "Username already in use", body = ErrorBody)
    )
)]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &scim_write_authority())?;
    let expected_version = required_version(&headers)?;
    let request: UserRequest = decode_json(&headers, &body)?;

    let candidate = User {
        id: id.clone(),
        ..request.into_user()
    };
    candidate
        .validate()
        .map_err(|e| ApiError::bad_request("invalid_user", e))?;

    // the creation time and password survive a replace
    let user = state
        .users
        .replace(&id, Some(expected_version), |stored| User {
            created: stored.created,
            password: stored.password.clone(),
            ..candidate
        })
        .map_err(store_error)?;
    info!("Updated user {} to version {}", user.id, user.version);
    Ok(user_response(&state, StatusCode::OK, user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/Users/{id}",
    tag = USERS_TAG,
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User deleted", body = UserDocument),
        (status = 401, description = "Missing scim.write authority", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &scim_write_authority())?;

    let user = state
        .users
        .delete(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    info!("Deleted user {} ({})", user.user_name, user.id);
    Ok(user_response(&state, StatusCode::OK, user))
}

/// Change a password, either as an administrator holding `password.write`
/// or as the user themselves presenting the old password
#[utoipa::path(
    put,
    path = "/Users/{id}/password",
    tag = USERS_TAG,
    request_body = PasswordChange,
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Password changed", body = PasswordChangeResponse),
        (status = 400, description = "Missing new password", body = ErrorBody),
        (status = 401, description = "Not permitted", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub(crate) async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PasswordChangeResponse>, ApiError> {
    let token = authenticate(&state, &headers)?;
    let request: PasswordChange = decode_json(&headers, &body)?;

    let user = state
        .users
        .get(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id.clone())))?;

    let administrator = Token::requirement()
        .with_audiences(["password"])
        .with_authorities(["password.write"]);
    let permitted = token.satisfies(&administrator)
        || (token.user_id.as_deref() == Some(user.id.as_str())
            && request
                .old_password
                .as_deref()
                .is_some_and(|old| user.password_matches(old)));
    if !permitted {
        warn!("Rejected password change for user {id}");
        return Err(ApiError::unauthorized("Not permitted to change this password"));
    }

    if request.password.is_empty() {
        return Err(ApiError::bad_request(
            "invalid_password",
            "A new password must be provided",
        ));
    }

    state
        .users
        .modify(&id, |stored| {
            stored.password = request.password;
            stored.last_modified = Utc::now();
        })
        .map_err(store_error)?;
    info!("Changed password of user {id}");
    Ok(Json(PasswordChangeResponse::ok()))
}

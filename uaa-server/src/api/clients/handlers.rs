use super::models::{ClientDocument, ClientRequest};
use crate::api::authn_middleware::authorize;
use crate::api::scim::{
    decode_json, optional_version, sort_resources, Filter, ScimList, SortOrder,
};
use crate::errors::{ApiError, ErrorBody};
use crate::headers::etag;
use crate::openapi::CLIENTS_TAG;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::ETAG, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http::HeaderMap;
use log::{info, warn};
use serde::Deserialize;
use uaa_core::models::Client;
use uaa_core::{StoreError, Token};
use utoipa::IntoParams;

const CLIENT_FILTERS: [&str; 2] = ["client_id", "name"];

fn client_sort_orders() -> [(&'static str, SortOrder<Client>); 2] {
    [
        ("client_id", |a, b| a.id.cmp(&b.id)),
        ("name", |a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))),
    ]
}

fn clients_read() -> Token {
    Token::requirement()
        .with_audiences(["clients"])
        .with_authorities(["clients.read"])
}

fn clients_write() -> Token {
    Token::requirement()
        .with_audiences(["clients"])
        .with_authorities(["clients.write"])
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(id) => {
            ApiError::not_found("not_found", format!("No client with requested id: {id}"))
        }
        StoreError::Conflict(id) => {
            warn!("Client already exists: {id}");
            ApiError::conflict("client_already_exists", format!("Client already exists: {id}"))
        }
        StoreError::VersionMismatch { expected, actual } => {
            warn!("Client version mismatch: expected {expected}, stored {actual}");
            ApiError::bad_request(
                "invalid_version",
                format!("Version mismatch: If-Match {expected}, current version {actual}"),
            )
        }
    }
}

fn client_response(status: StatusCode, client: Client) -> Response {
    (
        status,
        [(ETAG, etag(client.version))],
        Json(ClientDocument::from(client)),
    )
        .into_response()
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct ListClientsQuery {
    /// `client_id` or `name` compared with `eq`
    pub filter: Option<String>,
    /// `client_id` (default) or `name`
    pub sort_by: Option<String>,
}

/// Register a client
#[utoipa::path(
    post,
    path = "/oauth/clients",
    tag = CLIENTS_TAG,
    request_body = ClientRequest,
    responses(
        (status = 201, description = "Client created", body = ClientDocument),
        (status = 400, description = "Invalid client", body = ErrorBody),
        (status = 401, description = "Missing clients.write authority", body = ErrorBody),
        (status = 409, description = "Client already exists", body = ErrorBody)
    )
)]
pub(crate) async fn create_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &clients_write())?;
    let request: ClientRequest = decode_json(&headers, &body)?;

    let client = request.into_client();
    client
        .validate()
        .map_err(|e| ApiError::bad_request("invalid_client", e))?;

    let client = state.clients.create(client).map_err(store_error)?;
    info!("Created client {}", client.id);
    Ok(client_response(StatusCode::CREATED, client))
}

/// Fetch a client
#[utoipa::path(
    get,
    path = "/oauth/clients/{id}",
    tag = CLIENTS_TAG,
    params(("id" = String, Path, description = "Client identifier")),
    responses(
        (status = 200, description = "Client found", body = ClientDocument),
        (status = 401, description = "Missing clients.read authority", body = ErrorBody),
        (status = 404, description = "Unknown client", body = ErrorBody)
    )
)]
pub(crate) async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &clients_read())?;

    let client = state
        .clients
        .get(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    Ok(client_response(StatusCode::OK, client))
}

/// List clients
#[utoipa::path(
    get,
    path = "/oauth/clients",
    tag = CLIENTS_TAG,
    params(ListClientsQuery),
    responses(
        (status = 200, description = "SCIM list of clients", body = ScimList<ClientDocument>),
        (status = 400, description = "Invalid filter or sortBy", body = ErrorBody),
        (status = 401, description = "Missing clients.read authority", body = ErrorBody)
    )
)]
pub(crate) async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListClientsQuery>,
    headers: HeaderMap,
) -> Result<Json<ScimList<ClientDocument>>, ApiError> {
    authorize(&state, &headers, &clients_read())?;

    let mut clients = state.clients.all();
    if let Some(expression) = query.filter.as_deref() {
        let filter = Filter::parse(expression, &CLIENT_FILTERS)?;
        clients.retain(|client| match filter.attribute {
            "client_id" => client.id == filter.value,
            _ => client.name == filter.value,
        });
    }
    sort_resources(&mut clients, query.sort_by.as_deref(), &client_sort_orders())?;

    Ok(Json(ScimList::new(
        clients.into_iter().map(ClientDocument::from).collect(),
    )))
}

/// Replace a client registration
#[utoipa::path(
    put,
    path = "/oauth/clients/{id}",
    tag = CLIENTS_TAG,
    request_body = ClientRequest,
    params(
        ("id" = String, Path, description = "Client identifier"),
        ("If-Match" = Option<String>, Header, description = "Expected client version")
    ),
    responses(
        (status = 200, description = "Client updated", body = ClientDocument),
        (status = 400, description = "Invalid client or version", body = ErrorBody),
        (status = 401, description = "Missing clients.write authority", body = ErrorBody),
        (status = 404, description = "Unknown client", body = ErrorBody)
    )
)]
pub(crate) async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &clients_write())?;
    let expected_version = optional_version(&headers)?;
    let mut request: ClientRequest = decode_json(&headers, &body)?;

    if request.client_id.is_empty() {
        request.client_id = id.clone();
    } else if request.client_id != id {
        return Err(ApiError::bad_request(
            "invalid_client",
            format!("client_id {} does not match path id {id}", request.client_id),
        ));
    }

    let current = state
        .clients
        .get(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id.clone())))?;
    // secrets are never changed through this endpoint
    let candidate = Client {
        secret: current.secret,
        ..request.into_client()
    };
    candidate
        .validate()
        .map_err(|e| ApiError::bad_request("invalid_client", e))?;

    let client = state
        .clients
        .replace(&id, expected_version, |stored| Client {
            secret: stored.secret.clone(),
            ..candidate
        })
        .map_err(store_error)?;
    info!("Updated client {} to version {}", client.id, client.version);
    Ok(client_response(StatusCode::OK, client))
}

/// Delete a client
#[utoipa::path(
    delete,
    path = "/oauth/clients/{id}",
    tag = CLIENTS_TAG,
    params(("id" = String, Path, description = "Client identifier")),
    responses(
        (status = 200, description = "Client deleted", body = ClientDocument),
        (status = 401, description = "Missing clients.write scope", body = ErrorBody),
        (status = 404, description = "Unknown client", body = ErrorBody)
    )
)]
pub(crate) async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let required = Token::requirement()
        .with_audiences(["clients"])
        .with_scopes(["clients.write"]);
    authorize(&state, &headers, &required)?;

    let client = state
        .clients
        .delete(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    info!("Deleted client {}", client.id);
    Ok(client_response(StatusCode::OK, client))
}

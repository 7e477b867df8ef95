use super::models::{GroupDocument, GroupRequest, MemberDocument};
use crate::api::authn_middleware::authorize;
use crate::api::scim::{
    decode_json, required_version, sort_resources, Filter, ScimList, SortOrder,
};
use crate::errors::{ApiError, ErrorBody};
use crate::headers::etag;
use crate::openapi::GROUPS_TAG;
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
use uaa_core::models::{Group, Member};
use uaa_core::{StoreError, Token};
use utoipa::IntoParams;

const GROUP_FILTERS: [&str; 2] = ["id", "displayName"];

fn group_sort_orders() -> [(&'static str, SortOrder<Group>); 3] {
    [
        ("created", |a, b| a.created.cmp(&b.created)),
        ("id", |a, b| a.id.cmp(&b.id)),
        ("displayName", |a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        }),
    ]
}

fn scim_authority(authority: &str) -> Token {
    Token::requirement()
        .with_audiences(["scim"])
        .with_authorities([authority])
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(id) => ApiError::not_found(
            "scim_resource_not_found",
            format!("Group {id} does not exist"),
        ),
        StoreError::Conflict(display_name) => {
            warn!("Group already exists: {display_name}");
            ApiError::conflict(
                "scim_resource_already_exists",
                format!("A group with displayName: {display_name} already exists."),
            )
        }
        StoreError::VersionMismatch { expected, actual } => {
            warn!("Group version mismatch: expected {expected}, stored {actual}");
            ApiError::bad_request(
                "invalid_version",
                format!("Version mismatch: If-Match {expected}, current version {actual}"),
            )
        }
    }
}

fn member_not_found(group_id: &str, member_id: &str) -> ApiError {
    ApiError::not_found(
        "scim_resource_not_found",
        format!("Member {member_id} does not exist in group {group_id}"),
    )
}

fn group_response(status: StatusCode, group: Group) -> Response {
    (
        status,
        [(ETAG, etag(group.version))],
        Json(GroupDocument::from(group)),
    )
        .into_response()
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct ListGroupsQuery {
    /// `id` or `displayName` compared with `eq`
    pub filter: Option<String>,
    /// `created` (default), `id` or `displayName`
    pub sort_by: Option<String>,
}

/// Create a group
#[utoipa::path(
    post,
    path = "/Groups",
    tag = GROUPS_TAG,
    request_body = GroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupDocument),
        (status = 400, description = "Invalid group", body = ErrorBody),
        (status = 401, description = "Missing scim.write scope", body = ErrorBody),
        (status = 409, description = "displayName already in use", body = ErrorBody)
    )
)]
pub(crate) async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &Token::requirement().with_scopes(["scim.write"]))?;
    let request: GroupRequest = decode_json(&headers, &body)?;

    let group = request.into_group();
    group
        .validate()
        .map_err(|e| ApiError::bad_request("invalid_group", e))?;

    let group = state.groups.create(group).map_err(store_error)?;
    info!("Created group {} ({})", group.display_name, group.id);
    Ok(group_response(StatusCode::CREATED, group))
}

/// Fetch a group
#[utoipa::path(
    get,
    path = "/Groups/{id}",
    tag = GROUPS_TAG,
    params(("id" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Group found", body = GroupDocument),
        (status = 401, description = "Missing scim.read scope", body = ErrorBody),
        (status = 404, description = "Unknown group", body = ErrorBody)
    )
)]
pub(crate) async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &Token::requirement().with_scopes(["scim.read"]))?;

    let group = state
        .groups
        .get(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    Ok(group_response(StatusCode::OK, group))
}

/// List groups
#[utoipa::path(
    get,
    path = "/Groups",
    tag = GROUPS_TAG,
    params(ListGroupsQuery),
    responses(
        (status = 200, description = "SCIM list of groups", body = ScimList<GroupDocument>),
        (status = 400, description = "Invalid filter or sortBy", body = ErrorBody),
        (status = 401, description = "Missing scim.read authority", body = ErrorBody)
    )
)]
pub(crate) async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<ListGroupsQuery>,
    headers: HeaderMap,
) -> Result<Json<ScimList<GroupDocument>>, ApiError> {
    authorize(&state, &headers, &scim_authority("scim.read"))?;

    let mut groups = state.groups.all();
    if let Some(expression) = query.filter.as_deref() {
        let filter = Filter::parse(expression, &GROUP_FILTERS)?;
        groups.retain(|group| match filter.attribute {
            "id" => group.id == filter.value,
            _ => group.display_name == filter.value,
        });
    }
    sort_resources(&mut groups, query.sort_by.as_deref(), &group_sort_orders())?;

    Ok(Json(ScimList::new(
        groups.into_iter().map(GroupDocument::from).collect(),
    )))
}

/// Replace a group, members included
#[utoipa::path(
    put,
    path = "/Groups/{id}",
    tag = GROUPS_TAG,
    request_body = GroupRequest,
    params(
        ("id" = String, Path, description = "Group identifier"),
        ("If-Match" = String, Header, description = "Expected group version")
    ),
    responses(
        (status = 200, description = "Group updated", body = GroupDocument),
        (status = 400, description = "Invalid group or version", body = ErrorBody),
        (status = 401, description = "Missing scim.write authority", body = ErrorBody),
        (status = 404, description = "Unknown group", body = ErrorBody),
        (status = 409, description = "displayName already in use", body = ErrorBody)
    )
)]
pub(crate) async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &scim_authority("scim.write"))?;
    let expected_version = required_version(&headers)?;
    let request: GroupRequest = decode_json(&headers, &body)?;

    let candidate = Group {
        id: id.clone(),
        ..request.into_group()
    };
    candidate
        .validate()
        .map_err(|e| ApiError::bad_request("invalid_group", e))?;

    let group = state
        .groups
        .replace(&id, Some(expected_version), |stored| Group {
            created: stored.created,
            ..candidate
        })
        .map_err(store_error)?;
    info!("Updated group {} to version {}", group.id, group.version);
    Ok(group_response(StatusCode::OK, group))
}

/// Delete a group
#[utoipa::path(
    delete,
    path = "/Groups/{id}",
    tag = GROUPS_TAG,
    params(("id" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Group deleted", body = GroupDocument),
        (status = 401, description = "Missing scim.write scope", body = ErrorBody),
        (status = 404, description = "Unknown group", body = ErrorBody)
    )
)]
pub(crate) async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &Token::requirement().with_scopes(["scim.write"]))?;

    let group = state
        .groups
        .delete(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    info!("Deleted group {} ({})", group.display_name, group.id);
    Ok(group_response(StatusCode::OK, group))
}

/// Add a member to a group. Duplicates are not detected.
#[utoipa::path(
    post,
    path = "/Groups/{id}/members",
    tag = GROUPS_TAG,
    request_body = MemberDocument,
    params(("id" = String, Path, description = "Group identifier")),
    responses(
        (status = 201, description = "Member added", body = MemberDocument),
        (status = 400, description = "Invalid member", body = ErrorBody),
        (status = 401, description = "Missing scim.read authority", body = ErrorBody),
        (status = 404, description = "Unknown group", body = ErrorBody)
    )
)]
pub(crate) async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<MemberDocument>), ApiError> {
    authorize(&state, &headers, &scim_authority("scim.read"))?;
    let request: MemberDocument = decode_json(&headers, &body)?;

    if request.value.trim().is_empty() {
        return Err(ApiError::bad_request(
            "invalid_member",
            "A member value must be provided.",
        ));
    }

    let member = Member::from(request);
    state
        .groups
        .modify(&id, |group| group.add_member(member.clone()))
        .map_err(store_error)?;
    info!("Added member {} to group {id}", member.value);
    Ok((StatusCode::CREATED, Json(member.into())))
}

/// List the members of a group
#[utoipa::path(
    get,
    path = "/Groups/{id}/members",
    tag = GROUPS_TAG,
    params(("id" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Group members", body = Vec<MemberDocument>),
        (status = 401, description = "Missing scim.read authority", body = ErrorBody),
        (status = 404, description = "Unknown group", body = ErrorBody)
    )
)]
pub(crate) async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<MemberDocument>>, ApiError> {
    authorize(&state, &headers, &scim_authority("scim.read"))?;

    let group = state
        .groups
        .get(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    Ok(Json(
        group.members.into_iter().map(MemberDocument::from).collect(),
    ))
}

/// Check whether an identity is a member of a group
#[utoipa::path(
    get,
    path = "/Groups/{id}/members/{member_id}",
    tag = GROUPS_TAG,
    params(
        ("id" = String, Path, description = "Group identifier"),
        ("member_id" = String, Path, description = "Member identity")
    ),
    responses(
        (status = 200, description = "Member found", body = MemberDocument),
        (status = 401, description = "Missing scim.read authority", body = ErrorBody),
        (status = 404, description = "Unknown group or not a member", body = ErrorBody)
    )
)]
pub(crate) async fn get_member(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<MemberDocument>, ApiError> {
    authorize(&state, &headers, &scim_authority("scim.read"))?;

    let group = state
        .groups
        .get(&id)
        .ok_or_else(|| store_error(StoreError::NotFound(id.clone())))?;
    let member = group
        .member(&member_id)
        .cloned()
        .ok_or_else(|| member_not_found(&id, &member_id))?;
    Ok(Json(member.into()))
}

/// Remove a member from a group
#[utoipa::path(
    delete,
    path = "/Groups/{id}/members/{member_id}",
    tag = GROUPS_TAG,
    params(
        ("id" = String, Path, description = "Group identifier"),
        ("member_id" = String, Path, description = "Member identity")
    ),
    responses(
        (status = 200, description = "Member removed", body = MemberDocument),
        (status = 401, description = "Missing scim.write authority", body = ErrorBody),
        (status = 404, description = "Unknown group or not a member", body = ErrorBody)
    )
)]
pub(crate) async fn remove_member(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<MemberDocument>, ApiError> {
    authorize(&state, &headers, &scim_authority("scim.write"))?;

    let removed = state
        .groups
        .modify(&id, |group| group.remove_member(&member_id))
        .map_err(store_error)?
        .ok_or_else(|| member_not_found(&id, &member_id))?;
    info!("Removed member {member_id} from group {id}");
    Ok(Json(removed.into()))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestFixture;
    use http::StatusCode;
    use serde_json::json;
    use uaa_core::Token;

    async fn create_group(fixture: &TestFixture, display_name: &str) -> String {
        let response = fixture
            .post(
                "/Groups",
                &json!({"displayName": display_name}),
                &fixture.admin_token(),
            )
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json["id"].as_str().unwrap().to_string()
    }

    fn display_names(json: &serde_json::Value) -> Vec<&str> {
        json["resources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["displayName"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_create_and_get_group() {
        let fixture = TestFixture::new();
        let response = fixture
            .post(
                "/Groups",
                &json!({
                    "displayName": "admins",
                    "description": "Administrators",
                    "members": [{"value": "u1"}],
                }),
                &fixture.admin_token(),
            )
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.header("etag"), Some("\"0\""));
        let id = response.json["id"].as_str().unwrap();

        // scim.read as a scope is enough, no audience required
        let reader = fixture.sign(&Token::for_client("reader").with_scopes(["scim.read"]));
        let response = fixture.get(format!("/Groups/{id}"), &reader).await;
        response.assert_ok();
        assert_eq!(response.json["description"], "Administrators");
        assert_eq!(response.json["members"][0]["type"], "USER");

        fixture
            .get("/Groups/missing", &reader)
            .await
            .assert_error(StatusCode::NOT_FOUND, "scim_resource_not_found");
    }

    #[tokio::test]
    async fn test_create_group_errors() {
        let fixture = TestFixture::new();
        let token = fixture.admin_token();

        fixture
            .post("/Groups", &json!({"displayName": " "}), &token)
            .await
            .assert_error(StatusCode::BAD_REQUEST, "invalid_group");

        let first = create_group(&fixture, "admins").await;
        fixture
            .post("/Groups", &json!({"displayName": "admins"}), &token)
            .await
            .assert_error(StatusCode::CONFLICT, "scim_resource_already_exists");
        assert_eq!(fixture.state.groups.len(), 1);
        assert!(fixture.state.groups.get(&first).is_some());

        let reader = fixture.sign(&Token::for_client("reader").with_scopes(["scim.read"]));
        fixture
            .post("/Groups", &json!({"displayName": "ops"}), &reader)
            .await
            .assert_error(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    #[tokio::test]
    async fn test_list_groups() {
        let fixture = TestFixture::new();
        let token = fixture.admin_token();
        let zeta = create_group(&fixture, "zeta").await;
        create_group(&fixture, "alpha").await;

        let response = fixture.get("/Groups", &token).await;
        response.assert_ok();
        assert_eq!(display_names(&response.json), vec!["zeta", "alpha"]);

        let response = fixture.get("/Groups?sortBy=displayName", &token).await;
        assert_eq!(display_names(&response.json), vec!["alpha", "zeta"]);

        let response = fixture
            .get(format!("/Groups?filter=id%20eq%20%22{zeta}%22"), &token)
            .await;
        assert_eq!(display_names(&response.json), vec!["zeta"]);

        let response = fixture
            .get("/Groups?filter=displayname%20EQ%20%27alpha%27", &token)
            .await;
        assert_eq!(response.json["totalResults"], 1);

        fixture
            .get("/Groups?filter=description%20eq%20%27x%27", &token)
            .await
            .assert_error(StatusCode::BAD_REQUEST, "invalid_filter");
        fixture
            .get("/Groups?filter=displayName%20co%20%27a%27", &token)
            .await
            .assert_error(StatusCode::BAD_REQUEST, "invalid_filter");

        let scope_only = fixture.sign(&Token::for_client("reader").with_scopes(["scim.read"]));
        fixture
            .get("/Groups", &scope_only)
            .await
            .assert_error(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    #[tokio::test]
    async fn test_update_group_with_stale_version() {
        let fixture = TestFixture::new();
        let token = fixture.admin_token();
        let id = create_group(&fixture, "admins").await;
        let uri = format!("/Groups/{id}");

        fixture
            .put_with_headers(&uri, &json!({"displayName": "admins"}), &token, &[("If-Match", "0")])
            .await
            .assert_ok();
        let before = fixture.state.groups.get(&id).unwrap();
        assert_eq!(before.version, 1);

        fixture
            .put_with_headers(&uri, &json!({"displayName": "renamed"}), &token, &[("If-Match", "0")])
            .await
            .assert_error(StatusCode::BAD_REQUEST, "invalid_version");
        fixture
            .put_with_headers(&uri, &json!({"displayName": "renamed"}), &token, &[])
            .await
            .assert_error(StatusCode::BAD_REQUEST, "invalid_version");
        fixture
            .put_with_headers(&uri, &json!({"displayName": "renamed"}), &token, &[("If-Match", "one")])
            .await
            .assert_error(StatusCode::BAD_REQUEST, "invalid_version");

        assert_eq!(fixture.state.groups.get(&id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_group() {
        let fixture = TestFixture::new();
        let token = fixture.admin_token();
        let id = create_group(&fixture, "admins").await;
        create_group(&fixture, "ops").await;
        let uri = format!("/Groups/{id}");

        let response = fixture
            .put_with_headers(
                &uri,
                &json!({"displayName": "operators", "members": [{"value": "u9"}]}),
                &token,
                &[("If-Match", "\"0\"")],
            )
            .await;
        response.assert_ok();
        assert_eq!(response.header("etag"), Some("\"1\""));
        assert_eq!(response.json["id"], id.as_str());
        assert_eq!(response.json["members"][0]["value"], "u9");

        fixture
            .put_with_headers(&uri, &json!({"displayName": "ops"}), &token, &[("If-Match", "1")])
            .await
            .assert_error(StatusCode::CONFLICT, "scim_resource_already_exists");
        fixture
            .put_with_headers("/Groups/missing", &json!({"displayName": "x"}), &token, &[("If-Match", "0")])
            .await
            .assert_error(StatusCode::NOT_FOUND, "scim_resource_not_found");
    }

    #[tokio::test]
    async fn test_delete_group() {
        let fixture = TestFixture::new();
        let token = fixture.admin_token();
        let id = create_group(&fixture, "admins").await;

        let response = fixture.delete(format!("/Groups/{id}"), &token).await;
        response.assert_ok();
        assert_eq!(response.json["displayName"], "admins");
        fixture
            .delete(format!("/Groups/{id}"), &token)
            .await
            .assert_error(StatusCode::NOT_FOUND, "scim_resource_not_found");
    }

    #[tokio::test]
    async fn test_membership() {
        let fixture = TestFixture::new();
        let token = fixture.admin_token();
        let id = create_group(&fixture, "admins").await;
        let members = format!("/Groups/{id}/members");

        let response = fixture.post(&members, &json!({"value": "u1"}), &token).await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json, json!({"value": "u1", "type": "USER", "origin": "uaa"}));

        // duplicates are appended
        fixture
            .post(&members, &json!({"value": "u1"}), &token)
            .await
            .assert_status(StatusCode::CREATED);
        let response = fixture.get(&members, &token).await;
        response.assert_ok();
        assert_eq!(response.json.as_array().unwrap().len(), 2);
        assert_eq!(fixture.state.groups.get(&id).unwrap().version, 2);

        fixture
            .get(format!("{members}/u1"), &token)
            .await
            .assert_ok();
        fixture
            .get(format!("{members}/u2"), &token)
            .await
            .assert_error(StatusCode::NOT_FOUND, "scim_resource_not_found");

        fixture
            .delete(format!("{members}/u1"), &token)
            .await
            .assert_ok();
        assert_eq!(fixture.state.groups.get(&id).unwrap().members.len(), 1);
        fixture
            .delete(format!("{members}/u2"), &token)
            .await
            .assert_error(StatusCode::NOT_FOUND, "scim_resource_not_found");

        fixture
            .post("/Groups/missing/members", &json!({"value": "u1"}), &token)
            .await
            .assert_error(StatusCode::NOT_FOUND, "scim_resource_not_found");
        fixture
            .post(&members, &json!({"type": "USER"}), &token)
            .await
            .assert_error(StatusCode::BAD_REQUEST, "invalid_member");
    }

    #[tokio::test]
    async fn test_membership_requires_authority() {
        let fixture = TestFixture::new();
        let id = create_group(&fixture, "admins").await;
        let scope_only = fixture.sign(
            &Token::for_client("c1")
                .with_audiences(["scim"])
                .with_scopes(["scim.read", "scim.write"]),
        );

        fixture
            .post(format!("/Groups/{id}/members"), &json!({"value": "u1"}), &scope_only)
            .await
            .assert_error(StatusCode::UNAUTHORIZED, "unauthorized");
        fixture
            .get(format!("/Groups/{id}/members"), &scope_only)
            .await
            .assert_error(StatusCode::UNAUTHORIZED, "unauthorized");
    }
}

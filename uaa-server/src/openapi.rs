use crate::api::{clients, groups, health, oauth, users};
use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const OAUTH_TAG: &str = "OAuth API";
pub(crate) const CLIENTS_TAG: &str = "Clients API";
pub(crate) const USERS_TAG: &str = "Users API";
pub(crate) const GROUPS_TAG: &str = "Groups API";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        oauth::handlers::issue_token,
        oauth::handlers::authorize,
        oauth::handlers::token_key,
        oauth::handlers::token_keys,
        clients::handlers::create_client,
        clients::handlers::get_client,
        clients::handlers::list_clients,
        clients::handlers::update_client,
        clients::handlers::delete_client,
        users::handlers::create_user,
        users::handlers::get_user,
        users::handlers::list_users,
        users::handlers::update_user,
        users::handlers::delete_user,
        users::handlers::change_password,
        groups::handlers::create_group,
        groups::handlers::get_group,
        groups::handlers::list_groups,
        groups::handlers::update_group,
        groups::handlers::delete_group,
        groups::handlers::add_member,
        groups::handlers::list_members,
        groups::handlers::get_member,
        groups::handlers::remove_member,
    ),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = OAUTH_TAG, description = "Token issuance and verification keys"),
        (name = CLIENTS_TAG, description = "OAuth client registrations"),
        (name = USERS_TAG, description = "SCIM users"),
        (name = GROUPS_TAG, description = "SCIM groups and memberships"),
    ),
    info(
        title = "UAA API",
        description = "In-memory UAA compatible identity server",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;

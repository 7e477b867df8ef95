use serde::{Deserialize, Serialize};
use uaa_core::models::Client;
use utoipa::ToSchema;

/// `autoapprove` may be sent as a boolean or as a list of scopes
#[derive(Debug, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(untagged)]
pub enum Autoapprove {
    All(bool),
    Scopes(Vec<String>),
}

impl Default for Autoapprove {
    fn default() -> Self {
        Autoapprove::Scopes(Vec::new())
    }
}

impl Autoapprove {
    fn into_scopes(self) -> Vec<String> {
        match self {
            Autoapprove::All(true) => vec!["true".to_string()],
            Autoapprove::All(false) => Vec::new(),
            Autoapprove::Scopes(scopes) => scopes,
        }
    }
}

/// Client registration request body
#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct ClientRequest {
    /// Client identifier
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub name: String,
    /// Client secret, only honored on create
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub resource_ids: Vec<String>,
    #[serde(default)]
    pub authorities: Vec<String>,
    #[serde(default)]
    pub authorized_grant_types: Vec<String>,
    /// Access token validity in seconds
    #[serde(default)]
    pub access_token_validity: Option<u64>,
    #[serde(default)]
    pub redirect_uri: Vec<String>,
    #[serde(default)]
    pub autoapprove: Autoapprove,
}

impl ClientRequest {
    /// Builds the client this request describes
    pub fn into_client(self) -> Client {
        Client {
            name: self.name,
            secret: self.client_secret,
            scope: self.scope,
            resource_ids: self.resource_ids,
            authorities: self.authorities,
            authorized_grant_types: self.authorized_grant_types,
            access_token_validity: self.access_token_validity,
            redirect_uri: self.redirect_uri,
            autoapprove: self.autoapprove.into_scopes(),
            ..Client::new(self.client_id)
        }
    }
}

/// Client registration as returned by the API. The secret is never echoed.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ClientDocument {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub scope: Vec<String>,
    pub resource_ids: Vec<String>,
    pub authorities: Vec<String>,
    pub authorized_grant_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_validity: Option<u64>,
    pub redirect_uri: Vec<String>,
    pub autoapprove: Vec<String>,
    /// Milliseconds since the epoch
    #[serde(rename = "lastModified")]
    pub last_modified: i64,
}

impl From<Client> for ClientDocument {
    fn from(client: Client) -> Self {
        Self {
            client_id: client.id,
            name: client.name,
            scope: client.scope,
            resource_ids: client.resource_ids,
            authorities: client.authorities,
            authorized_grant_types: client.authorized_grant_types,
            access_token_validity: client.access_token_validity,
            redirect_uri: client.redirect_uri,
            autoapprove: client.autoapprove,
            last_modified: client.last_modified.timestamp_millis(),
        }
    }
}

use crate::error::ValidationError;
use crate::store::Resource;
use chrono::{DateTime, Utc};

pub const GRANT_IMPLICIT: &str = "implicit";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const GRANT_PASSWORD: &str = "password";

/// Grant types a client may be registered with
pub const ALLOWED_GRANT_TYPES: [&str; 5] = [
    GRANT_IMPLICIT,
    GRANT_REFRESH_TOKEN,
    GRANT_AUTHORIZATION_CODE,
    GRANT_CLIENT_CREDENTIALS,
    GRANT_PASSWORD,
];

pub const ADMIN_CLIENT_ID: &str = "admin";

const ADMIN_CAPABILITIES: [&str; 7] = [
    "clients.read",
    "clients.write",
    "clients.secret",
    "password.write",
    "scim.read",
    "scim.write",
    "uaa.admin",
];

/// An OAuth2 client registration
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub secret: String,
    pub scope: Vec<String>,
    pub resource_ids: Vec<String>,
    pub authorities: Vec<String>,
    pub authorized_grant_types: Vec<String>,
    pub access_token_validity: Option<u64>,
    pub redirect_uri: Vec<String>,
    pub autoapprove: Vec<String>,
    pub version: u64,
    pub last_modified: DateTime<Utc>,
}

impl Client {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            secret: String::new(),
            scope: Vec::new(),
            resource_ids: Vec::new(),
            authorities: Vec::new(),
            authorized_grant_types: Vec::new(),
            access_token_validity: None,
            redirect_uri: Vec::new(),
            autoapprove: Vec::new(),
            version: 0,
            last_modified: Utc::now(),
        }
    }

    /// The superuser client present in every fresh client store
    pub fn admin() -> Self {
        let capabilities: Vec<String> = ADMIN_CAPABILITIES.iter().map(|c| c.to_string()).collect();
        Self {
            name: ADMIN_CLIENT_ID.to_string(),
            secret: ADMIN_CLIENT_ID.to_string(),
            scope: capabilities.clone(),
            authorities: capabilities,
            authorized_grant_types: vec![GRANT_CLIENT_CREDENTIALS.to_string()],
            ..Self::new(ADMIN_CLIENT_ID)
        }
    }

    pub fn has_grant_type(&self, grant_type: &str) -> bool {
        self.authorized_grant_types.iter().any(|g| g == grant_type)
    }

    /// Whether every one of `scopes` is auto-approved for this client.
    /// `"true"` in the autoapprove list approves everything.
    pub fn autoapproves(&self, scopes: &[String]) -> bool {
        if self.autoapprove.iter().any(|s| s == "true") {
            return true;
        }
        scopes.iter().all(|scope| self.autoapprove.contains(scope))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::new("A client_id must be provided."));
        }

        if self.authorized_grant_types.is_empty() {
            return Err(ValidationError::new(format!(
                "An authorized grant type must be provided. Must be one of: [{}]",
                ALLOWED_GRANT_TYPES.join(" ")
            )));
        }

        if let Some(unknown) = self
            .authorized_grant_types
            .iter()
            .find(|g| !ALLOWED_GRANT_TYPES.contains(&g.as_str()))
        {
            return Err(ValidationError::new(format!(
                "{unknown} is not an allowed grant type. Must be one of: [{}]",
                ALLOWED_GRANT_TYPES.join(" ")
            )));
        }

        if !self.redirect_uri.is_empty()
            && !self.has_grant_type(GRANT_IMPLICIT)
            && !self.has_grant_type(GRANT_AUTHORIZATION_CODE)
        {
            return Err(ValidationError::new(
                "A redirect_uri can only be used by implicit or authorization_code grant types.",
            ));
        }

        if self.has_grant_type(GRANT_IMPLICIT) && !self.secret.is_empty() {
            return Err(ValidationError::new(
                "Implicit grant should not have a client_secret",
            ));
        }

        Ok(())
    }
}

impl Resource for Client {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    // client names are display labels, only the id is unique
    fn holds_name(&self) -> bool {
        false
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
        self.last_modified = Utc::now();
    }
}

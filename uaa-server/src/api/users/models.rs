use crate::api::scim::{ScimMeta, SCIM_CORE_SCHEMA};
use serde::{Deserialize, Serialize};
use uaa_core::models::{Email, Group, Name, User, DEFAULT_ORIGIN};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NameDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub formatted: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub family_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub given_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub middle_name: String,
}

impl From<NameDocument> for Name {
    fn from(name: NameDocument) -> Self {
        Self {
            formatted: name.formatted,
            family_name: name.family_name,
            given_name: name.given_name,
            middle_name: name.middle_name,
        }
    }
}

impl From<Name> for NameDocument {
    fn from(name: Name) -> Self {
        Self {
            formatted: name.formatted,
            family_name: name.family_name,
            given_name: name.given_name,
            middle_name: name.middle_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct EmailDocument {
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

/// Emails are accepted as SCIM objects or as plain addresses
#[derive(Debug, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(untagged)]
pub enum EmailInput {
    Address(String),
    Entry(EmailDocument),
}

impl From<EmailInput> for Email {
    fn from(input: EmailInput) -> Self {
        match input {
            EmailInput::Address(value) => Email::new(value),
            EmailInput::Entry(entry) => Email {
                value: entry.value,
                primary: entry.primary,
            },
        }
    }
}

/// User create and update request body
#[derive(Debug, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub name: NameDocument,
    #[serde(default)]
    pub emails: Vec<EmailInput>,
    /// Defaults to true
    pub active: Option<bool>,
    pub verified: Option<bool>,
    /// Defaults to "uaa"
    pub origin: Option<String>,
    /// Only honored on create
    pub password: Option<String>,
}

impl UserRequest {
    /// Builds a new user with a generated id
    pub fn into_user(self) -> User {
        let base = User::new(self.user_name);
        User {
            external_id: self.external_id,
            name: self.name.into(),
            emails: self.emails.into_iter().map(Email::from).collect(),
            active: self.active.unwrap_or(true),
            verified: self.verified.unwrap_or(false),
            origin: self
                .origin
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            password: self.password.unwrap_or_default(),
            ..base
        }
    }
}

/// A group the user belongs to directly
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct GroupRef {
    pub value: String,
    pub display: String,
    #[serde(rename = "type")]
    pub membership_type: String,
}

impl GroupRef {
    pub fn direct(group: &Group) -> Self {
        Self {
            value: group.id.clone(),
            display: group.display_name.clone(),
            membership_type: "DIRECT".to_string(),
        }
    }
}

/// A user as returned by the API. The password is never echoed.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub user_name: String,
    pub name: NameDocument,
    pub emails: Vec<EmailDocument>,
    pub groups: Vec<GroupRef>,
    pub active: bool,
    pub verified: bool,
    pub origin: String,
    pub meta: ScimMeta,
    pub schemas: Vec<String>,
}

impl UserDocument {
    pub fn new(user: User, groups: Vec<GroupRef>) -> Self {
        Self {
            meta: ScimMeta::new(user.version, user.created, user.last_modified),
            id: user.id,
            external_id: user.external_id,
            user_name: user.user_name,
            name: user.name.into(),
            emails: user
                .emails
                .into_iter()
                .map(|e| EmailDocument {
                    value: e.value,
                    primary: e.primary,
                })
                .collect(),
            groups,
            active: user.active,
            verified: user.verified,
            origin: user.origin,
            schemas: vec![SCIM_CORE_SCHEMA.to_string()],
        }
    }
}

/// Body of `PUT /Users/{id}/password`
#[derive(Debug, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[serde(default)]
    pub password: String,
    /// Required when a user changes their own password
    pub old_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct PasswordChangeResponse {
    pub status: String,
    pub message: String,
}

impl PasswordChangeResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "password updated".to_string(),
        }
    }
}

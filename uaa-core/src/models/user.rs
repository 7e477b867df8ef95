use crate::error::ValidationError;
use crate::store::Resource;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const DEFAULT_ORIGIN: &str = "uaa";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Name {
    pub formatted: String,
    pub family_name: String,
    pub given_name: String,
    pub middle_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email {
    pub value: String,
    pub primary: bool,
}

impl Email {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            primary: false,
        }
    }
}

/// A SCIM user.
///
/// Passwords are kept and compared as plain strings. This is a test double
/// and must not be used to store real credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub external_id: String,
    pub user_name: String,
    pub name: Name,
    pub emails: Vec<Email>,
    pub active: bool,
    pub verified: bool,
    pub origin: String,
    pub password: String,
    pub version: u64,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl User {
    /// A new active user with a generated id
    pub fn new(user_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            external_id: String::new(),
            user_name: user_name.into(),
            name: Name::default(),
            emails: Vec::new(),
            active: true,
            verified: false,
            origin: DEFAULT_ORIGIN.to_string(),
            password: String::new(),
            version: 0,
            created: now,
            last_modified: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_name.trim().is_empty() {
            return Err(ValidationError::new("A username must be provided."));
        }
        if !self.emails.iter().any(|e| !e.value.trim().is_empty()) {
            return Err(ValidationError::new("An email must be provided."));
        }
        Ok(())
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

impl Resource for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.user_name
    }

    fn name_matches(&self, name: &str) -> bool {
        self.user_name.eq_ignore_ascii_case(name)
    }

    fn holds_name(&self) -> bool {
        self.active
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
        self.last_modified = Utc::now();
    }
}

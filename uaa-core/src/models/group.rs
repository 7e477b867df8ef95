use crate::error::ValidationError;
use crate::models::user::DEFAULT_ORIGIN;
use crate::store::Resource;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const MEMBER_TYPE_USER: &str = "USER";
pub const MEMBER_TYPE_GROUP: &str = "GROUP";

/// A reference from a group to a user, client or nested group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub value: String,
    pub member_type: String,
    pub origin: String,
}

impl Member {
    pub fn user(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            member_type: MEMBER_TYPE_USER.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub members: Vec<Member>,
    pub version: u64,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Group {
    pub fn new(display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            display_name: display_name.into(),
            description: String::new(),
            members: Vec::new(),
            version: 0,
            created: now,
            last_modified: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.display_name.trim().is_empty() {
            return Err(ValidationError::new("A displayName must be provided."));
        }
        if self.members.iter().any(|m| m.value.trim().is_empty()) {
            return Err(ValidationError::new("Every member must have a value."));
        }
        Ok(())
    }

    /// Appends a member without duplicate detection
    pub fn add_member(&mut self, member: Member) {
        self.members.push(member);
        self.touch();
    }

    /// Removes the first member with this value
    pub fn remove_member(&mut self, value: &str) -> Option<Member> {
        let index = self.members.iter().position(|m| m.value == value)?;
        let removed = self.members.remove(index);
        self.touch();
        Some(removed)
    }

    pub fn member(&self, value: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.value == value)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.last_modified = Utc::now();
    }
}

impl Resource for Group {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.display_name
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
        self.last_modified = Utc::now();
    }
}

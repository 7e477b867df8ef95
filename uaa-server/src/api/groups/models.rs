use crate::api::scim::{ScimMeta, SCIM_CORE_SCHEMA};
use serde::{Deserialize, Serialize};
use uaa_core::models::{Group, Member, DEFAULT_ORIGIN, MEMBER_TYPE_USER};
use utoipa::ToSchema;

/// A group member as sent and returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct MemberDocument {
    #[serde(default)]
    pub value: String,
    /// `USER` (default) or `GROUP`
    #[serde(rename = "type", default = "default_member_type")]
    pub member_type: String,
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_member_type() -> String {
    MEMBER_TYPE_USER.to_string()
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

impl From<MemberDocument> for Member {
    fn from(doc: MemberDocument) -> Self {
        Self {
            value: doc.value,
            member_type: doc.member_type,
            origin: doc.origin,
        }
    }
}

impl From<Member> for MemberDocument {
    fn from(member: Member) -> Self {
        Self {
            value: member.value,
            member_type: member.member_type,
            origin: member.origin,
        }
    }
}

/// Group create and update request body
#[derive(Debug, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<MemberDocument>,
}

impl GroupRequest {
    /// Builds a new group with a generated id
    pub fn into_group(self) -> Group {
        Group {
            description: self.description,
            members: self.members.into_iter().map(Member::from).collect(),
            ..Group::new(self.display_name)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupDocument {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub members: Vec<MemberDocument>,
    pub meta: ScimMeta,
    pub schemas: Vec<String>,
}

impl From<Group> for GroupDocument {
    fn from(group: Group) -> Self {
        Self {
            meta: ScimMeta::new(group.version, group.created, group.last_modified),
            id: group.id,
            display_name: group.display_name,
            description: group.description,
            members: group.members.into_iter().map(MemberDocument::from).collect(),
            schemas: vec![SCIM_CORE_SCHEMA.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_defaults() {
        let request: GroupRequest = serde_json::from_value(json!({
            "displayName": "admins",
            "members": [{"value": "u1"}, {"value": "g2", "type": "GROUP", "origin": "ldap"}],
        }))
        .unwrap();
        let group = request.into_group();

        assert_eq!(group.members[0], Member::user("u1"));
        assert_eq!(group.members[1].member_type, "GROUP");
        assert_eq!(group.members[1].origin, "ldap");
    }

    #[test]
    fn test_document_shape() {
        let mut group = Group::new("admins");
        group.add_member(Member::user("u1"));
        let json = serde_json::to_value(GroupDocument::from(group)).unwrap();

        assert_eq!(json["displayName"], "admins");
        assert!(json.get("description").is_none());
        assert_eq!(json["members"], json!([{"value": "u1", "type": "USER", "origin": "uaa"}]));
        assert_eq!(json["meta"]["version"], 1);
    }
}

mod client;
mod group;
mod user;

pub use client::{
    ADMIN_CLIENT_ID, ALLOWED_GRANT_TYPES, Client, GRANT_AUTHORIZATION_CODE,
    GRANT_CLIENT_CREDENTIALS, GRANT_IMPLICIT, GRANT_PASSWORD, GRANT_REFRESH_TOKEN,
};
pub use group::{Group, MEMBER_TYPE_GROUP, MEMBER_TYPE_USER, Member};
pub use user::{DEFAULT_ORIGIN, Email, Name, User};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, IF_MATCH};
use http::HeaderMap;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Extracts the token from an `Authorization: Bearer <token>` header.
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Decodes `Authorization: Basic <base64(user:secret)>`
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, secret) = decoded.split_once(':')?;
    Some((user.to_string(), secret.to_string()))
}

/// The state of an `If-Match` precondition header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfMatch {
    Absent,
    Version(u64),
    Invalid(String),
}

/// Parses `If-Match`, accepting a bare (`3`), quoted (`"3"`) or weak
/// (`W/"3"`) integer version
pub fn if_match(headers: &HeaderMap) -> IfMatch {
    let Some(value) = headers.get(IF_MATCH) else {
        return IfMatch::Absent;
    };
    let Ok(raw) = value.to_str() else {
        return IfMatch::Invalid("<non-ascii>".to_string());
    };

    let version = raw.trim();
    let version = version.strip_prefix("W/").unwrap_or(version);
    let version = version.trim_matches('"');
    match version.parse::<u64>() {
        Ok(version) => IfMatch::Version(version),
        Err(_) => IfMatch::Invalid(raw.to_string()),
    }
}

/// The ETag value announcing a resource version
pub fn etag(version: u64) -> String {
    format!("\"{version}\"")
}

/// Whether the request body is declared as JSON
pub fn has_json_body(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase().starts_with(JSON_MEDIA_TYPE))
        .unwrap_or(false)
}

/// Whether the client explicitly accepts JSON responses
pub fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|media| {
            media
                .split(';')
                .next()
                .map(|m| m.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
                .unwrap_or(false)
        })
}

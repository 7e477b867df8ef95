//! The authorization unit carried inside every signed access token.

use serde_json::{Map, Value};

const USER_ID_CLAIM: &str = "user_id";
const CLIENT_ID_CLAIM: &str = "client_id";
const SCOPE_CLAIM: &str = "scope";
const AUTHORITIES_CLAIM: &str = "authorities";
const AUDIENCE_CLAIM: &str = "aud";
const ISSUER_CLAIM: &str = "iss";

/// A decoded (or to-be-signed) access token.
///
/// A token normally represents either a user (`user_id`) or a client acting
/// for itself (`client_id`). The same type doubles as a requirement: a
/// handler describes the capabilities it needs as a `Token` and checks the
/// caller's token with [`Token::satisfies`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub authorities: Vec<String>,
    pub audiences: Vec<String>,
    pub issuer: Option<String>,
}

impl Token {
    /// A token issued to a client acting for itself
    pub fn for_client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Default::default()
        }
    }

    /// A token issued on behalf of a user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    /// An empty requirement, satisfied by every token
    pub fn requirement() -> Self {
        Self::default()
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audiences = audiences.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Whether this token carries at least the capabilities of `expected`.
    ///
    /// Audiences, scopes and authorities must each be a superset of the
    /// expected sets. Empty expected sets always pass.
    pub fn satisfies(&self, expected: &Token) -> bool {
        contains_all(&self.audiences, &expected.audiences)
            && contains_all(&self.scopes, &expected.scopes)
            && contains_all(&self.authorities, &expected.authorities)
    }

    /// Builds the claims map that gets signed.
    ///
    /// `scope` is always present, `aud` is a single space-joined string.
    pub(crate) fn to_claims(&self) -> Map<String, Value> {
        let mut claims = Map::new();

        if let Some(user_id) = self.user_id.as_deref().filter(|id| !id.is_empty()) {
            claims.insert(USER_ID_CLAIM.to_string(), Value::from(user_id));
        }
        if let Some(client_id) = self.client_id.as_deref().filter(|id| !id.is_empty()) {
            claims.insert(CLIENT_ID_CLAIM.to_string(), Value::from(client_id));
        }
        if !self.authorities.is_empty() {
            claims.insert(
                AUTHORITIES_CLAIM.to_string(),
                Value::from(self.authorities.clone()),
            );
        }
        claims.insert(SCOPE_CLAIM.to_string(), Value::from(self.scopes.clone()));
        if !self.audiences.is_empty() {
            claims.insert(
                AUDIENCE_CLAIM.to_string(),
                Value::from(self.audiences.join(" ")),
            );
        }
        if let Some(issuer) = self.issuer.as_deref().filter(|iss| !iss.is_empty()) {
            claims.insert(ISSUER_CLAIM.to_string(), Value::from(issuer));
        }

        claims
    }

    /// Rebuilds a token from a verified claims map.
    ///
    /// Each claim is type-checked on its own; a missing claim or one of the
    /// wrong JSON type is treated as absent rather than failing the decode.
    pub(crate) fn from_claims(claims: &Map<String, Value>) -> Self {
        Self {
            user_id: string_claim(claims, USER_ID_CLAIM),
            client_id: string_claim(claims, CLIENT_ID_CLAIM),
            scopes: list_claim(claims, SCOPE_CLAIM),
            authorities: list_claim(claims, AUTHORITIES_CLAIM),
            audiences: string_claim(claims, AUDIENCE_CLAIM)
                .map(|aud| aud.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            issuer: string_claim(claims, ISSUER_CLAIM),
        }
    }
}

fn contains_all(held: &[String], required: &[String]) -> bool {
    required.iter().all(|item| held.contains(item))
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    match claims.get(name) {
        Some(Value::String(value)) if !value.is_empty() => Some(value.clone()),
        _ => None,
    }
}

fn list_claim(claims: &Map<String, Value>, name: &str) -> Vec<String> {
    match claims.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

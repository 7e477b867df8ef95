//! Pieces shared by the SCIM style resource endpoints: request body
//! decoding, the list document, filters, sorting and version preconditions.

use crate::errors::ApiError;
use crate::headers::{has_json_body, if_match, IfMatch};
use axum::body::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use http::HeaderMap;
use log::debug;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::LazyLock;
use utoipa::ToSchema;

pub(crate) const SCIM_CORE_SCHEMA: &str = "urn:scim:schemas:core:1.0";

static FILTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(\w+)\s+(\w+)\s+(?:'([^']*)'|"([^"]*)")\s*$"#)
        .expect("filter pattern is valid")
});

/// Decodes a JSON request body, rejecting other content types
pub(crate) fn decode_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, ApiError> {
    if !has_json_body(headers) {
        return Err(ApiError::bad_request(
            "invalid_request",
            "Content-Type must be application/json",
        ));
    }
    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected request body: {e}");
        ApiError::bad_request("invalid_request", format!("Invalid request body: {e}"))
    })
}

/// A page of resources in SCIM list form
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScimList<T> {
    pub resources: Vec<T>,
    pub start_index: usize,
    pub items_per_page: usize,
    pub total_results: usize,
    pub schemas: Vec<String>,
}

impl<T> ScimList<T> {
    pub fn new(resources: Vec<T>) -> Self {
        let total = resources.len();
        Self {
            resources,
            start_index: 1,
            items_per_page: total,
            total_results: total,
            schemas: vec![SCIM_CORE_SCHEMA.to_string()],
        }
    }
}

/// Version and timestamps of a SCIM resource
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScimMeta {
    pub version: u64,
    /// RFC 3339 timestamp
    pub created: String,
    /// RFC 3339 timestamp
    pub last_modified: String,
}

impl ScimMeta {
    pub fn new(version: u64, created: DateTime<Utc>, last_modified: DateTime<Utc>) -> Self {
        Self {
            version,
            created: created.to_rfc3339_opts(SecondsFormat::Millis, true),
            last_modified: last_modified.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// A parsed `<attribute> eq '<value>'` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Filter {
    /// The attribute name as spelled in the allow list
    pub attribute: &'static str,
    pub value: String,
}

impl Filter {
    /// Parses a filter expression. Only `eq` is supported and the attribute
    /// must appear (case-insensitively) in `allowed`.
    pub fn parse(expression: &str, allowed: &[&'static str]) -> Result<Self, ApiError> {
        let captures = FILTER_PATTERN
            .captures(expression)
            .ok_or_else(|| invalid_filter(format!("Invalid filter expression: {expression}")))?;

        let attribute = &captures[1];
        let operator = &captures[2];
        let value = captures
            .get(3)
            .or_else(|| captures.get(4))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        if !operator.eq_ignore_ascii_case("eq") {
            return Err(invalid_filter(format!(
                "Unsupported filter operator: {operator}"
            )));
        }

        let attribute = allowed
            .iter()
            .find(|a| a.eq_ignore_ascii_case(attribute))
            .ok_or_else(|| invalid_filter(format!("Invalid filter attribute: {attribute}")))?;

        debug!("Filtering on {attribute} eq '{value}'");
        Ok(Self { attribute, value })
    }
}

fn invalid_filter(description: String) -> ApiError {
    ApiError::bad_request("invalid_filter", description)
}

/// A comparison used to order a list response
pub(crate) type SortOrder<T> = fn(&T, &T) -> Ordering;

/// Sorts `items` by the `sortBy` attribute, falling back to the first entry
/// of `orders`. Attribute names compare case-insensitively.
pub(crate) fn sort_resources<T>(
    items: &mut [T],
    sort_by: Option<&str>,
    orders: &[(&str, SortOrder<T>)],
) -> Result<(), ApiError> {
    let order = match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
        None => orders.first().map(|(_, order)| *order),
        Some(requested) => orders
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(requested))
            .map(|(_, order)| *order),
    };

    let order = order.ok_or_else(|| {
        ApiError::bad_request(
            "invalid_request",
            format!("Unsupported sortBy: {}", sort_by.unwrap_or_default()),
        )
    })?;
    items.sort_by(order);
    Ok(())
}

/// The version an update must be made against; `If-Match` is mandatory
pub(crate) fn required_version(headers: &HeaderMap) -> Result<u64, ApiError> {
    match if_match(headers) {
        IfMatch::Version(version) => Ok(version),
        IfMatch::Absent => Err(ApiError::bad_request(
            "invalid_version",
            "Missing If-Match for PUT",
        )),
        IfMatch::Invalid(raw) => Err(ApiError::bad_request(
            "invalid_version",
            format!("Invalid If-Match version: {raw}"),
        )),
    }
}

/// Like [`required_version`], but an absent header skips the check
pub(crate) fn optional_version(headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
    match if_match(headers) {
        IfMatch::Absent => Ok(None),
        _ => required_version(headers).map(Some),
    }
}

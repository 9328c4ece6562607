//! Pagination descriptors
//!
//! Two page-walking idioms exist across AWS APIs:
//!
//! - `NextToken`: the response names a token, the next request echoes it
//! - `IsTruncated` + `Marker`: a flag says more pages exist, a marker says where
//!
//! A [`Paginator`] names the three fields an operation uses, which is enough
//! to ask for the next page and to join two pages into one response.

use super::error::{CollectError, Result};
use crate::aws::client::Request;
use serde_json::Value;

/// How a response signals that another page exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// A non-empty token field means more pages
    Token { response_field: String },
    /// A true flag means more pages; the marker says where to resume
    Truncated {
        flag_field: String,
        marker_field: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    continuation: Continuation,
    request_field: String,
    list_field: String,
}

impl Paginator {
    /// Token style: `Paginator::new("NextToken", "NextToken", "Reservations")`
    pub fn new(response_token_field: &str, request_token_field: &str, list_field: &str) -> Self {
        Self {
            continuation: Continuation::Token {
                response_field: response_token_field.to_string(),
            },
            request_field: request_token_field.to_string(),
            list_field: list_field.to_string(),
        }
    }

    /// Truncated-flag style: `Paginator::truncated("IsTruncated", "Marker", "Things")`
    pub fn truncated(flag_field: &str, marker_field: &str, list_field: &str) -> Self {
        Self {
            continuation: Continuation::Truncated {
                flag_field: flag_field.to_string(),
                marker_field: marker_field.to_string(),
            },
            request_field: marker_field.to_string(),
            list_field: list_field.to_string(),
        }
    }

    pub fn list_field(&self) -> &str {
        &self.list_field
    }

    /// The request for the page after `response`, or `None` on the last page
    pub fn next_request(
        &self,
        operation: &str,
        request: &Request,
        response: &Value,
    ) -> Result<Option<Request>> {
        let token = match &self.continuation {
            Continuation::Token { response_field } => present(response.get(response_field)),
            Continuation::Truncated {
                flag_field,
                marker_field,
            } => {
                if response.get(flag_field) != Some(&Value::Bool(true)) {
                    return Ok(None);
                }
                match present(response.get(marker_field)) {
                    Some(marker) => Some(marker),
                    None => {
                        return Err(CollectError::pagination(
                            operation,
                            format!("response {}, but has no {}", flag_field, marker_field),
                        ))
                    }
                }
            }
        };

        Ok(token.map(|token| {
            let mut next = request.clone();
            next.insert(self.request_field.clone(), token.clone());
            next
        }))
    }

    /// Fail unless `response` carries the list field as an array
    pub fn check_list(&self, operation: &str, response: &Value) -> Result<()> {
        match response.get(&self.list_field) {
            Some(Value::Array(_)) => Ok(()),
            _ => Err(CollectError::pagination(
                operation,
                format!("response has no {} list", self.list_field),
            )),
        }
    }

    /// Concatenate the list fields; everything else comes from `later`
    pub fn join(&self, operation: &str, earlier: Value, later: Value) -> Result<Value> {
        let missing = || {
            CollectError::pagination(
                operation,
                format!(
                    "Can't join pages - at least one of them is missing {}",
                    self.list_field
                ),
            )
        };

        let Value::Object(earlier) = earlier else {
            return Err(missing());
        };
        let Value::Object(mut later) = later else {
            return Err(missing());
        };

        let Some(Value::Array(mut items)) = earlier.get(&self.list_field).cloned() else {
            return Err(missing());
        };
        let Some(Value::Array(more)) = later.remove(&self.list_field) else {
            return Err(missing());
        };

        items.extend(more);
        later.insert(self.list_field.clone(), Value::Array(items));
        Ok(Value::Object(later))
    }
}

/// A continuation value that actually continues: not null, false or ""
fn present(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        v => Some(v),
    }
}

/// Describe why a response looks like one page of many, if it does
///
/// Used when the caller gave no paginator: a truncated flag, or a response
/// made of exactly one string field and one array field, is almost always a
/// list plus an unhandled continuation token.
pub fn unhandled_pagination(response: &Value) -> Option<String> {
    let map = response.as_object()?;

    if map.get("IsTruncated") == Some(&Value::Bool(true)) {
        return Some("response IsTruncated, but has no Marker handling".to_string());
    }

    let strings = map.values().filter(|v| v.is_string()).count();
    let arrays = map.values().filter(|v| v.is_array()).count();

    if strings == 1 && arrays == 1 {
        let mut keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        return Some(format!(
            "Response seems to contain pagination data, but no paginator was provided. Keys are: {}",
            keys.join(",")
        ));
    }

    None
}

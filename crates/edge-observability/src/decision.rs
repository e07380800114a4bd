//! Decision log payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How the request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Redirect,
    PassThrough,
}

/// Serializable summary of one routing decision.
///
/// Purely diagnostic; nothing reads it back to make decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Request path.
    pub uri: String,
    /// Variant the client ended up in ("A" or "B").
    pub variant: String,
    /// "cookie" when read from the client, "draw" when freshly assigned.
    pub source: String,
    /// Redirect or pass-through.
    pub outcome: DecisionOutcome,
    /// Response status for redirects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Redirect target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// `Set-Cookie` value, when a fresh assignment was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_cookie: Option<String>,
    /// Random draw behind a fresh assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<f64>,
}

impl DecisionRecord {
    /// Flatten into log fields, omitting absent values.
    pub fn to_fields(&self) -> BTreeMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

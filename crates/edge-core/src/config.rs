//! Origin routing configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Errors from origin map validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OriginError {
    #[error("route '{pattern}' points at unknown origin '{origin}'")]
    UnknownOrigin { pattern: String, origin: String },

    #[error("default origin '{0}' is not declared")]
    UnknownDefault(String),

    #[error("invalid route pattern: {0}")]
    InvalidPattern(String),
}

/// A path pattern mapped to a named origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginRoute {
    /// Exact path (e.g. "/health") or prefix wildcard (e.g. "/blue/*").
    pub pattern: String,
    /// Origin name this route resolves to.
    pub origin: String,
}

impl OriginRoute {
    /// Create a new route.
    pub fn new(pattern: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            origin: origin.into(),
        }
    }

    /// Check whether a request path matches this route.
    pub fn matches(&self, uri: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => uri.starts_with(prefix),
            None => uri == self.pattern,
        }
    }
}

/// Path-based origin table, mirroring the distribution behaviours in front
/// of the two deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMap {
    /// Origin used when no route matches.
    #[serde(default = "default_origin")]
    pub default_origin: String,

    /// Ordered routes; the first match wins.
    #[serde(default = "default_routes")]
    pub routes: Vec<OriginRoute>,

    /// Base URLs keyed by origin name. An empty URL means "not configured".
    #[serde(default = "default_origins")]
    pub origins: BTreeMap<String, String>,
}

fn default_origin() -> String {
    "green".to_string()
}

fn default_routes() -> Vec<OriginRoute> {
    vec![OriginRoute::new("/blue/*", "blue")]
}

fn default_origins() -> BTreeMap<String, String> {
    let mut origins = BTreeMap::new();
    origins.insert("green".to_string(), String::new());
    origins.insert("blue".to_string(), String::new());
    origins
}

impl Default for OriginMap {
    fn default() -> Self {
        Self {
            default_origin: default_origin(),
            routes: default_routes(),
            origins: default_origins(),
        }
    }
}

impl OriginMap {
    /// Set the base URL for a named origin.
    pub fn with_origin(mut self, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.origins.insert(name.into(), base_url.into());
        self
    }

    /// Add a route after the existing ones.
    pub fn with_route(mut self, route: OriginRoute) -> Self {
        self.routes.push(route);
        self
    }

    /// Resolve the origin name serving `uri`.
    pub fn resolve(&self, uri: &str) -> &str {
        self.routes
            .iter()
            .find(|route| route.matches(uri))
            .map(|route| route.origin.as_str())
            .unwrap_or(self.default_origin.as_str())
    }

    /// Full upstream URL for `path_and_query`, if the resolved origin has a base URL.
    pub fn origin_url(&self, path_and_query: &str) -> Option<String> {
        let path = path_and_query.split('?').next().unwrap_or(path_and_query);
        let base = self.origins.get(self.resolve(path))?;
        if base.is_empty() {
            return None;
        }
        Some(format!("{}{}", base.trim_end_matches('/'), path_and_query))
    }

    /// Validate that every referenced origin is declared.
    pub fn validate(&self) -> Result<(), OriginError> {
        if !self.origins.contains_key(&self.default_origin) {
            return Err(OriginError::UnknownDefault(self.default_origin.clone()));
        }

        for route in &self.routes {
            if !route.pattern.starts_with('/') {
                return Err(OriginError::InvalidPattern(route.pattern.clone()));
            }
            if route.pattern.trim_end_matches('*').contains('*') {
                return Err(OriginError::InvalidPattern(route.pattern.clone()));
            }
            if !self.origins.contains_key(&route.origin) {
                return Err(OriginError::UnknownOrigin {
                    pattern: route.pattern.clone(),
                    origin: route.origin.clone(),
                });
            }
        }

        Ok(())
    }
}

//! Experiment configuration.

use edge_core::{SameSite, SetCookie};
use serde::{Deserialize, Serialize};

use crate::policy::{AssignmentPolicy, DEFAULT_PROBABILITY_A};
use crate::variant::Variant;

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("cookie name must not be empty")]
    EmptyCookieName,

    #[error("cookie name contains an invalid character: {0:?}")]
    InvalidCookieName(String),

    #[error("probability_a must be within [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("{field} must be an absolute path starting with '/', got {value:?}")]
    RelativePath { field: &'static str, value: String },
}

/// Optional attributes attached to the experiment `Set-Cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAttributes {
    /// `Path` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// `Max-Age` in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_secs: Option<u64>,
    /// `Secure` flag.
    #[serde(default)]
    pub secure: bool,
    /// `HttpOnly` flag.
    #[serde(default)]
    pub http_only: bool,
    /// `SameSite` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

/// Policy knobs for the experiment router.
///
/// Defaults reproduce the deployed behaviour: a 75/25 split on the
/// `X-Experiment-Name` cookie with variant B served from `/blue/index.html`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Name of the experiment cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Probability that a first-time visitor is assigned variant A.
    #[serde(default = "default_probability_a")]
    pub probability_a: f64,

    /// Path on which sticky B clients are redirected to the B location.
    #[serde(default = "default_root_uri")]
    pub root_uri: String,

    /// Redirect target for variant A.
    #[serde(default = "default_variant_a_location")]
    pub variant_a_location: String,

    /// Redirect target for variant B.
    #[serde(default = "default_variant_b_location")]
    pub variant_b_location: String,

    /// Attributes for the `Set-Cookie` header.
    #[serde(default)]
    pub cookie: CookieAttributes,
}

fn default_cookie_name() -> String {
    "X-Experiment-Name".to_string()
}

fn default_probability_a() -> f64 {
    DEFAULT_PROBABILITY_A
}

fn default_root_uri() -> String {
    "/".to_string()
}

fn default_variant_a_location() -> String {
    "/".to_string()
}

fn default_variant_b_location() -> String {
    "/blue/index.html".to_string()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            probability_a: default_probability_a(),
            root_uri: default_root_uri(),
            variant_a_location: default_variant_a_location(),
            variant_b_location: default_variant_b_location(),
            cookie: CookieAttributes::default(),
        }
    }
}

impl ExperimentConfig {
    /// Set the cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the probability of variant A.
    pub fn with_probability_a(mut self, probability: f64) -> Self {
        self.probability_a = probability;
        self
    }

    /// Set the variant B redirect target.
    pub fn with_variant_b_location(mut self, location: impl Into<String>) -> Self {
        self.variant_b_location = location.into();
        self
    }

    /// Set the `Set-Cookie` attributes.
    pub fn with_cookie_attributes(mut self, attributes: CookieAttributes) -> Self {
        self.cookie = attributes;
        self
    }

    /// Assignment policy derived from this config.
    pub fn policy(&self) -> AssignmentPolicy {
        AssignmentPolicy::new(self.probability_a)
    }

    /// Redirect target for a variant.
    pub fn location_for(&self, variant: Variant) -> &str {
        match variant {
            Variant::A => &self.variant_a_location,
            Variant::B => &self.variant_b_location,
        }
    }

    /// `Set-Cookie` header value recording `variant`.
    pub fn set_cookie_for(&self, variant: Variant) -> String {
        let mut cookie = SetCookie::new(&self.cookie_name, variant.as_str())
            .secure(self.cookie.secure)
            .http_only(self.cookie.http_only);
        if let Some(path) = &self.cookie.path {
            cookie = cookie.with_path(path);
        }
        if let Some(max_age) = self.cookie.max_age_secs {
            cookie = cookie.with_max_age(max_age);
        }
        if let Some(same_site) = self.cookie.same_site {
            cookie = cookie.with_same_site(same_site);
        }
        cookie.render()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_name.is_empty() {
            return Err(ConfigError::EmptyCookieName);
        }
        if self
            .cookie_name
            .chars()
            .any(|c| c == '=' || c == ';' || c == ',' || c.is_whitespace() || c.is_control())
        {
            return Err(ConfigError::InvalidCookieName(self.cookie_name.clone()));
        }

        // NaN fails the range check too
        if !(0.0..=1.0).contains(&self.probability_a) {
            return Err(ConfigError::ProbabilityOutOfRange(self.probability_a));
        }

        for (field, value) in [
            ("root_uri", &self.root_uri),
            ("variant_a_location", &self.variant_a_location),
            ("variant_b_location", &self.variant_b_location),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::RelativePath {
                    field,
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }
}

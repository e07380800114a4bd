//! CLI configuration.

use std::collections::HashMap;

use anyhow::{Context, Result};
use edge_core::OriginMap;
use edge_experiment::ExperimentConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CLI configuration file (`edge.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Experiment policy.
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Origin routing table.
    #[serde(default)]
    pub origins: OriginMap,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(path, &content)
    }

    /// Parse config text; `.json` paths are JSON, everything else TOML.
    pub fn parse(path: &str, content: &str) -> Result<Self> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(content).with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Serialize in the format implied by `path`.
    pub fn render(&self, path: &str) -> Result<String> {
        Ok(if path.ends_with(".json") {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        })
    }

    /// Save config to a file.
    pub fn save(&self, path: &str) -> Result<()> {
        let content = self.render(path)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path))
    }

    /// Get environment-specific config.
    pub fn for_environment(&self, env: &str) -> Result<CliConfig> {
        let env_config = self
            .environments
            .get(env)
            .with_context(|| format!("Unknown environment: {}", env))?;

        let mut config = self.clone();
        if let Some(ref experiment) = env_config.experiment {
            config.experiment = overlay(&self.experiment, experiment)
                .with_context(|| format!("Invalid [environments.{}.experiment]", env))?;
        }
        if let Some(ref origins) = env_config.origins {
            config.origins = overlay(&self.origins, origins)
                .with_context(|| format!("Invalid [environments.{}.origins]", env))?;
        }

        Ok(config)
    }
}

/// Environment-specific configuration overrides.
///
/// Sections are partial: only the keys present replace the base values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Experiment override table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<Value>,

    /// Origin table override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origins: Option<Value>,
}

/// Apply a partial override table on top of `base`.
fn overlay<T: Serialize + DeserializeOwned>(base: &T, patch: &Value) -> Result<T> {
    let mut merged = serde_json::to_value(base)?;
    merge(&mut merged, patch);
    Ok(serde_json::from_value(merged)?)
}

/// Deep-merge tables; anything else in `patch` replaces the base value.
fn merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(base.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// Generate a default edge.toml config file.
pub fn generate_default_config() -> String {
    r#"# Edge experiment router configuration

[experiment]
cookie_name = "X-Experiment-Name"
# Share of first-time visitors assigned variant A
probability_a = 0.75
root_uri = "/"
variant_a_location = "/"
variant_b_location = "/blue/index.html"

# Optional Set-Cookie attributes
[experiment.cookie]
# path = "/"
# max_age_secs = 2592000
secure = false
http_only = false

[origins]
default_origin = "green"

[[origins.routes]]
pattern = "/blue/*"
origin = "blue"

[origins.origins]
green = ""
blue = ""

[environments.staging.experiment]
probability_a = 0.5
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = CliConfig::parse("edge.toml", &generate_default_config()).unwrap();
        assert_eq!(config.experiment, ExperimentConfig::default());
        assert_eq!(config.origins, OriginMap::default());
        assert!(config.environments.contains_key("staging"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CliConfig::parse("edge.toml", "").unwrap();
        assert_eq!(config.experiment.probability_a, 0.75);
        assert_eq!(config.origins.resolve("/blue/x"), "blue");
    }

    #[test]
    fn test_environment_override() {
        let config = CliConfig::parse("edge.toml", &generate_default_config()).unwrap();
        let staging = config.for_environment("staging").unwrap();
        assert_eq!(staging.experiment.probability_a, 0.5);
        assert_eq!(staging.experiment.cookie_name, "X-Experiment-Name");
        assert!(config.for_environment("production").is_err());
    }

    #[test]
    fn test_environment_override_keeps_unmentioned_fields() {
        let content = r#"
[experiment]
cookie_name = "exp-2024"
variant_b_location = "/blue/home.html"

[experiment.cookie]
path = "/"

[origins.origins]
green = "https://green.example.com"
blue = "https://blue.example.com"

[environments.staging.experiment]
probability_a = 0.5

[environments.staging.experiment.cookie]
secure = true

[environments.staging.origins.origins]
blue = "https://blue-staging.example.com"
"#;
        let config = CliConfig::parse("edge.toml", content).unwrap();
        let staging = config.for_environment("staging").unwrap();

        assert_eq!(staging.experiment.probability_a, 0.5);
        assert_eq!(staging.experiment.cookie_name, "exp-2024");
        assert_eq!(staging.experiment.variant_b_location, "/blue/home.html");
        assert_eq!(staging.experiment.cookie.path.as_deref(), Some("/"));
        assert!(staging.experiment.cookie.secure);
        assert_eq!(
            staging.origins.origin_url("/").as_deref(),
            Some("https://green.example.com/")
        );
        assert_eq!(
            staging.origins.origin_url("/blue/index.html").as_deref(),
            Some("https://blue-staging.example.com/blue/index.html")
        );
    }

    #[test]
    fn test_environment_override_rejects_wrong_types() {
        let content = r#"
[environments.broken.experiment]
probability_a = "half"
"#;
        let config = CliConfig::parse("edge.toml", content).unwrap();
        assert!(config.for_environment("broken").is_err());
    }

    #[test]
    fn test_json_round_trip_format() {
        let config = CliConfig::default();
        let json = config.render("edge.json").unwrap();
        let parsed = CliConfig::parse("edge.json", &json).unwrap();
        assert_eq!(parsed.experiment, config.experiment);
    }
}

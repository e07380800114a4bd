//! Component settings from Spin variables.

use anyhow::{bail, Context, Result};
use edge_core::{OriginMap, SameSite};
use edge_experiment::ExperimentConfig;
use edge_observability::{LogFormat, LogLevel};

/// Resolved component settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub experiment: ExperimentConfig,
    pub origins: OriginMap,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            experiment: ExperimentConfig::default(),
            origins: OriginMap::default(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Json,
        }
    }
}

impl Settings {
    /// Load from Spin variables. Unset or empty variables keep their defaults.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| {
            spin_sdk::variables::get(name)
                .ok()
                .filter(|value| !value.is_empty())
        })
    }

    /// Build settings from a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Settings::default();
        let experiment = &mut settings.experiment;

        if let Some(name) = lookup("cookie_name") {
            experiment.cookie_name = name;
        }
        if let Some(raw) = lookup("probability_a") {
            experiment.probability_a = parse(&raw, "probability_a")?;
        }
        if let Some(uri) = lookup("root_uri") {
            experiment.root_uri = uri;
        }
        if let Some(location) = lookup("variant_a_location") {
            experiment.variant_a_location = location;
        }
        if let Some(location) = lookup("variant_b_location") {
            experiment.variant_b_location = location;
        }

        let cookie = &mut experiment.cookie;
        if let Some(path) = lookup("cookie_path") {
            cookie.path = Some(path);
        }
        if let Some(raw) = lookup("cookie_max_age_secs") {
            cookie.max_age_secs = Some(parse(&raw, "cookie_max_age_secs")?);
        }
        if let Some(raw) = lookup("cookie_secure") {
            cookie.secure = parse(&raw, "cookie_secure")?;
        }
        if let Some(raw) = lookup("cookie_http_only") {
            cookie.http_only = parse(&raw, "cookie_http_only")?;
        }
        if let Some(raw) = lookup("cookie_same_site") {
            cookie.same_site = Some(same_site(&raw)?);
        }

        experiment
            .validate()
            .context("invalid experiment configuration")?;

        if let Some(url) = lookup("green_origin") {
            settings.origins = settings.origins.with_origin("green", url);
        }
        if let Some(url) = lookup("blue_origin") {
            settings.origins = settings.origins.with_origin("blue", url);
        }

        if let Some(raw) = lookup("log_level") {
            settings.log_level = raw.parse()?;
        }
        if let Some(raw) = lookup("log_format") {
            settings.log_format = raw.parse()?;
        }

        Ok(settings)
    }
}

fn parse<T>(raw: &str, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{} has an invalid value: {:?}", name, raw))
}

fn same_site(raw: &str) -> Result<SameSite> {
    Ok(match raw.trim().to_ascii_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => bail!("cookie_same_site has an invalid value: {:?}", raw),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.experiment, ExperimentConfig::default());
        assert_eq!(settings.origins.origin_url("/"), None);
        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("cookie_name", "exp"),
            ("probability_a", " 0.5 "),
            ("green_origin", "https://green.example.com"),
            ("blue_origin", "https://blue.example.com"),
        ]))
        .unwrap();

        assert_eq!(settings.experiment.cookie_name, "exp");
        assert_eq!(settings.experiment.probability_a, 0.5);
        assert_eq!(
            settings.origins.origin_url("/blue/index.html").as_deref(),
            Some("https://blue.example.com/blue/index.html")
        );
    }

    #[test]
    fn test_root_and_cookie_attributes() {
        let settings = Settings::from_lookup(lookup(&[
            ("root_uri", "/home"),
            ("cookie_path", "/"),
            ("cookie_max_age_secs", "86400"),
            ("cookie_secure", "true"),
            ("cookie_http_only", "true"),
            ("cookie_same_site", "Lax"),
        ]))
        .unwrap();

        let experiment = &settings.experiment;
        assert_eq!(experiment.root_uri, "/home");
        assert_eq!(experiment.cookie.same_site, Some(SameSite::Lax));
        assert_eq!(
            experiment.set_cookie_for(edge_experiment::Variant::B),
            "X-Experiment-Name=B; Path=/; Max-Age=86400; Secure; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_log_settings() {
        let settings =
            Settings::from_lookup(lookup(&[("log_level", "debug"), ("log_format", "human")]))
                .unwrap();
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.log_format, LogFormat::Human);

        assert!(Settings::from_lookup(lookup(&[("log_level", "chatty")])).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Settings::from_lookup(lookup(&[("probability_a", "lots")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("probability_a", "1.5")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("root_uri", "home")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("cookie_secure", "yes")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("cookie_same_site", "loose")])).is_err());
    }
}

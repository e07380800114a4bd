//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};
use dialoguer::Confirm;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CliConfig};
use crate::context::{Context, CONFIG_NAMES};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Get { key } => get_config(&key, ctx).await,
        ConfigCommand::Set { key, value } => set_config(&key, &value, ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match ctx.config_path {
        Some(ref path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let experiment = &ctx.config.experiment;
    ctx.output.info("[experiment]");
    ctx.output.kv("cookie_name", &experiment.cookie_name);
    ctx.output.kv("probability_a", &experiment.probability_a.to_string());
    ctx.output.kv("root_uri", &experiment.root_uri);
    ctx.output.kv("variant_a_location", &experiment.variant_a_location);
    ctx.output.kv("variant_b_location", &experiment.variant_b_location);

    let cookie = &experiment.cookie;
    if let Some(ref path) = cookie.path {
        ctx.output.kv("cookie.path", path);
    }
    if let Some(max_age) = cookie.max_age_secs {
        ctx.output.kv("cookie.max_age_secs", &max_age.to_string());
    }
    ctx.output.kv("cookie.secure", &cookie.secure.to_string());
    ctx.output.kv("cookie.http_only", &cookie.http_only.to_string());

    ctx.output.info("[origins]");
    ctx.output.kv("default_origin", &ctx.config.origins.default_origin);
    for route in &ctx.config.origins.routes {
        ctx.output.kv(&route.pattern, &route.origin);
    }
    for (name, url) in &ctx.config.origins.origins {
        let url = if url.is_empty() { "(unset)" } else { url.as_str() };
        ctx.output.kv(&format!("origins.{}", name), url);
    }

    if !ctx.config.environments.is_empty() {
        let mut envs: Vec<&String> = ctx.config.environments.keys().collect();
        envs.sort();
        ctx.output.info(&format!(
            "Environments: {}",
            envs.iter().map(|e| e.as_str()).collect::<Vec<_>>().join(", ")
        ));
    }

    Ok(())
}

async fn get_config(key: &str, ctx: &Context) -> Result<()> {
    let value = get_config_value(&ctx.config, key)?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{}", value);
    }

    Ok(())
}

async fn set_config(key: &str, value: &str, ctx: &Context) -> Result<()> {
    let config_path = match ctx.config_path {
        Some(ref path) => path.to_string_lossy().to_string(),
        None => find_config_file(&ctx.cwd)?,
    };

    // Reload without environment overrides so they are not written back.
    let mut config = CliConfig::load(&config_path)?;
    set_config_value(&mut config, key, value)?;

    config
        .experiment
        .validate()
        .with_context(|| format!("Refusing to set {} = {}", key, value))?;
    config.origins.validate()?;

    config.save(&config_path)?;

    ctx.output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("edge.toml");

    if config_path.exists() && !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmed {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                config_path.display()
            );
        }
    }

    fs::write(&config_path, generate_default_config())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if let Err(e) = ctx.config.experiment.validate() {
        errors.push(format!("experiment: {}", e));
    }
    if let Err(e) = ctx.config.origins.validate() {
        errors.push(format!("origins: {}", e));
    }

    let experiment = &ctx.config.experiment;
    if experiment.variant_a_location == experiment.variant_b_location {
        warnings.push("variant_a_location and variant_b_location are identical".to_string());
    }
    if experiment.probability_a == 0.0 || experiment.probability_a == 1.0 {
        warnings.push(format!(
            "probability_a = {} sends every new visitor to one variant",
            experiment.probability_a
        ));
    }
    for (name, url) in &ctx.config.origins.origins {
        if url.is_empty() {
            warnings.push(format!("origins.{} has no URL; pass-through will fail", name));
        }
    }

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

fn get_config_value(config: &CliConfig, key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('.').collect();
    let experiment = &config.experiment;

    match parts.as_slice() {
        ["experiment", "cookie_name"] => Ok(experiment.cookie_name.clone()),
        ["experiment", "probability_a"] => Ok(experiment.probability_a.to_string()),
        ["experiment", "root_uri"] => Ok(experiment.root_uri.clone()),
        ["experiment", "variant_a_location"] => Ok(experiment.variant_a_location.clone()),
        ["experiment", "variant_b_location"] => Ok(experiment.variant_b_location.clone()),
        ["experiment", "cookie", "secure"] => Ok(experiment.cookie.secure.to_string()),
        ["experiment", "cookie", "http_only"] => Ok(experiment.cookie.http_only.to_string()),
        ["experiment", "cookie", "path"] => Ok(experiment
            .cookie
            .path
            .clone()
            .unwrap_or_else(|| "null".to_string())),
        ["experiment", "cookie", "max_age_secs"] => Ok(experiment
            .cookie
            .max_age_secs
            .map(|s| s.to_string())
            .unwrap_or_else(|| "null".to_string())),
        ["origins", "default_origin"] => Ok(config.origins.default_origin.clone()),
        ["origins", "origins", name] => config
            .origins
            .origins
            .get(*name)
            .cloned()
            .with_context(|| format!("Unknown origin: {}", name)),
        _ => bail!("Unknown config key: {}", key),
    }
}

fn set_config_value(config: &mut CliConfig, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let experiment = &mut config.experiment;

    match parts.as_slice() {
        ["experiment", "cookie_name"] => experiment.cookie_name = value.to_string(),
        ["experiment", "probability_a"] => experiment.probability_a = value.parse()?,
        ["experiment", "root_uri"] => experiment.root_uri = value.to_string(),
        ["experiment", "variant_a_location"] => experiment.variant_a_location = value.to_string(),
        ["experiment", "variant_b_location"] => experiment.variant_b_location = value.to_string(),
        ["experiment", "cookie", "secure"] => experiment.cookie.secure = value.parse()?,
        ["experiment", "cookie", "http_only"] => experiment.cookie.http_only = value.parse()?,
        ["experiment", "cookie", "path"] => experiment.cookie.path = Some(value.to_string()),
        ["experiment", "cookie", "max_age_secs"] => {
            experiment.cookie.max_age_secs = Some(value.parse()?)
        }
        ["origins", "default_origin"] => config.origins.default_origin = value.to_string(),
        ["origins", "origins", name] => {
            config
                .origins
                .origins
                .insert(name.to_string(), value.to_string());
        }
        _ => bail!("Unknown or read-only config key: {}", key),
    }

    Ok(())
}

fn find_config_file(cwd: &std::path::Path) -> Result<String> {
    for name in &CONFIG_NAMES {
        let path = cwd.join(name);
        if path.exists() {
            return Ok(path.to_string_lossy().to_string());
        }
    }
    bail!("No config file found. Run `edge config init` to create one.")
}

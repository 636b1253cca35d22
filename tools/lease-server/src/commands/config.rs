//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, ServerConfig, StoreBackend};
use crate::context::{Context, CONFIG_NAMES};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force, path } => init_config(force, path.as_deref(), ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match ctx.config_path {
        Some(ref path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "defaults"),
    }

    let config = &ctx.config;

    ctx.output.info("");
    ctx.output.info("[server]");
    ctx.output.kv("host", &config.server.host);
    ctx.output.kv("port", &config.server.port.to_string());

    ctx.output.info("");
    ctx.output.info("[store]");
    let backend = match config.store.backend {
        StoreBackend::Redis => "redis",
        StoreBackend::Memory => "memory",
    };
    ctx.output.kv("backend", backend);
    ctx.output.kv("host", &config.store.host);
    ctx.output.kv("port", &config.store.port.to_string());

    ctx.output.info("");
    ctx.output.info("[lease]");
    ctx.output.kv("ttl_secs", &config.lease.ttl_secs.to_string());
    ctx.output.kv("write_mode", &config.lease.write_mode.to_string());

    ctx.output.info("");
    ctx.output.info("[log]");
    ctx.output.kv("level", config.log.level.as_filter());
    ctx.output.kv("format", &format!("{:?}", config.log.format).to_lowercase());

    Ok(())
}

fn init_config(force: bool, path: Option<&str>, ctx: &Context) -> Result<()> {
    let config_path = ctx.resolve_path(path.unwrap_or(CONFIG_NAMES[0]));

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())?;
    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let warnings = check(&ctx.config)?;
    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        ctx.output.success("Configuration is valid (with warnings)");
    }

    Ok(())
}

/// Validate, returning warnings for settings that work but are unusual.
fn check(config: &ServerConfig) -> Result<Vec<String>> {
    config.validate()?;

    let mut warnings = Vec::new();
    if config.store.backend == StoreBackend::Memory {
        warnings.push(
            "store.backend 'memory' does not share leases between instances".to_string(),
        );
    }
    if config.lease.write_mode == lease_core::WriteMode::Overwrite {
        warnings.push(
            "lease.write_mode 'overwrite' lets concurrent creators overwrite each other"
                .to_string(),
        );
    }
    if config.lease.ttl_secs < 30 {
        warnings.push(format!(
            "lease.ttl_secs {} is shorter than a typical editing session",
            config.lease.ttl_secs
        ));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lease_core::WriteMode;

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(check(&ServerConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_unusual_settings_warn() {
        let mut config = ServerConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.lease.write_mode = WriteMode::Overwrite;
        config.lease.ttl_secs = 10;
        assert_eq!(check(&config).unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_config_errors() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(check(&config).is_err());
    }
}

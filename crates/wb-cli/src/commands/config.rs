//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success};
use wb_core::config::{self, BridgeConfig};

/// Print the effective configuration as TOML
pub fn config_show(effective: &BridgeConfig) -> Result<()> {
    let text = toml::to_string_pretty(effective).context("Failed to serialize configuration")?;
    print!("{}", text);
    Ok(())
}

/// Print one value of the effective configuration (e.g. `reconnect.step`)
pub fn config_get(effective: &BridgeConfig, key: &str) -> Result<()> {
    let value = toml::Value::try_from(effective).context("Failed to serialize configuration")?;

    let mut current = &value;
    for part in key.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => anyhow::bail!("Key not found: {}", key),
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Table(_) => print!("{}", toml::to_string_pretty(current)?),
        other => println!("{}", other),
    }
    Ok(())
}

/// Print the config file path that would be read
pub fn config_path(config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    println!("{}", path.display());
    Ok(())
}

/// Write a config file holding the defaults
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let config_file: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);

    if config_file.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", config_file));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&config_file, &BridgeConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

    print_success(&format!("Created configuration file: {:?}", config_file));
    Ok(())
}

//! Effective configuration for one invocation
//!
//! Layers, lowest first: defaults, TOML file, environment, command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use wb_core::config::{self, BridgeConfig};

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Command timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Build the configuration from the process environment
pub fn resolve(config_path: Option<&Path>, overrides: &Overrides) -> Result<BridgeConfig> {
    resolve_with(config_path, overrides, |key| std::env::var(key).ok())
}

/// Build the configuration with an arbitrary environment lookup
///
/// An explicit `config_path` must exist. Without one, the default config
/// file is read only if present.
pub fn resolve_with<F>(
    config_path: Option<&Path>,
    overrides: &Overrides,
    lookup: F,
) -> Result<BridgeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: BridgeConfig = match config_path {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                config::load_config(&default_path)
                    .with_context(|| format!("Failed to load config from {:?}", default_path))?
            } else {
                BridgeConfig::default()
            }
        }
    };

    config
        .apply_env_with(lookup)
        .context("Invalid bridge environment")?;
    apply_overrides(&mut config, overrides)?;

    Ok(config)
}

fn apply_overrides(config: &mut BridgeConfig, overrides: &Overrides) -> Result<()> {
    if let Some(host) = &overrides.host {
        config.host = Some(host.clone());
    }
    if let Some(port) = overrides.port {
        anyhow::ensure!(port != 0, "Port must be between 1 and 65535");
        config.port = Some(port);
    }
    if let Some(ms) = overrides.timeout_ms {
        anyhow::ensure!(ms > 0, "Timeout must be positive");
        config.command_timeout = Duration::from_millis(ms);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_layers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "host = \"10.0.0.2\"\nport = 9300\ncommand_timeout = 1500\n",
        )
        .unwrap();

        let config = resolve_with(Some(&path), &Overrides::default(), env(&[])).unwrap();
        assert_eq!(config.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(config.port, Some(9300));
        assert_eq!(config.command_timeout, Duration::from_millis(1500));

        let config = resolve_with(
            Some(&path),
            &Overrides::default(),
            env(&[("MCP_BRIDGE_HOST", "10.0.0.3"), ("MCP_BRIDGE_PORT", "9400")]),
        )
        .unwrap();
        assert_eq!(config.host.as_deref(), Some("10.0.0.3"));
        assert_eq!(config.port, Some(9400));

        let overrides = Overrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(9500),
            timeout_ms: Some(250),
        };
        let config = resolve_with(
            Some(&path),
            &overrides,
            env(&[("MCP_BRIDGE_HOST", "10.0.0.3"), ("MCP_BRIDGE_PORT", "9400")]),
        )
        .unwrap();
        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.port, Some(9500));
        assert_eq!(config.command_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(resolve_with(Some(&path), &Overrides::default(), env(&[])).is_err());
    }

    #[test]
    fn test_bad_env_port_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let result = resolve_with(
            Some(&path),
            &Overrides::default(),
            env(&[("MCP_BRIDGE_PORT", "not-a-port")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_overrides_rejected() {
        let mut config = BridgeConfig::default();
        let port = Overrides {
            port: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(&mut config, &port).is_err());

        let timeout = Overrides {
            timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(&mut config, &timeout).is_err());
    }
}

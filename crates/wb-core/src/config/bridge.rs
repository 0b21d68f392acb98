//! Bridge client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_millis;
use crate::error::ConfigError;

/// Host used when nothing else is configured
pub const DEFAULT_HOST: &str = "localhost";

/// Port the bridge plugin listens on by default
pub const DEFAULT_PORT: u16 = 9223;

/// Preferred host override
pub const ENV_BRIDGE_HOST: &str = "MCP_BRIDGE_HOST";

/// Host exported by the Tauri mobile dev tooling
pub const ENV_DEV_HOST: &str = "TAURI_DEV_HOST";

/// Port override; its presence marks the port as explicit
pub const ENV_BRIDGE_PORT: &str = "MCP_BRIDGE_PORT";

/// Configuration for the bridge client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Configured application host (None = `localhost`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Configured application port (None = 9223, and discovery allowed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Default timeout for a single command
    #[serde(with = "duration_millis")]
    pub command_timeout: Duration,

    /// Timeout for one connection attempt during session start
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,

    /// Timeout for a discovery liveness probe
    #[serde(with = "duration_millis")]
    pub probe_timeout: Duration,

    /// Timeout for the identity query made after attaching
    #[serde(with = "duration_millis")]
    pub identity_timeout: Duration,

    /// First port scanned by discovery
    pub discovery_base_port: u16,

    /// Number of ports scanned by discovery
    pub discovery_max_ports: u16,

    /// Connect on demand when a command is sent on a closed channel
    pub auto_connect: bool,

    /// Reconnection policy after unexpected closure
    pub reconnect: ReconnectConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            command_timeout: Duration::from_millis(5000),
            connect_timeout: Duration::from_millis(5000),
            probe_timeout: Duration::from_millis(100),
            identity_timeout: Duration::from_millis(1000),
            discovery_base_port: DEFAULT_PORT,
            discovery_max_ports: 100,
            auto_connect: false,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Overlay the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay environment values from an arbitrary lookup
    ///
    /// Host: `MCP_BRIDGE_HOST`, then `TAURI_DEV_HOST`. Port: `MCP_BRIDGE_PORT`.
    /// Empty values count as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_BRIDGE_HOST).or_else(|| get(ENV_DEV_HOST)) {
            tracing::debug!(host = %host, "Host taken from environment");
            self.host = Some(host.trim().to_string());
        }

        if let Some(raw) = get(ENV_BRIDGE_PORT) {
            let port = raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| ConfigError::InvalidPort {
                    source_name: ENV_BRIDGE_PORT.to_string(),
                    value: raw.clone(),
                })?;
            tracing::debug!(port, "Port taken from environment");
            self.port = Some(port);
        }

        Ok(())
    }

    /// Host to use when none is passed explicitly
    pub fn resolved_host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Port to use when none is passed explicitly
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Whether a port was configured rather than defaulted
    pub fn port_is_explicit(&self) -> bool {
        self.port.is_some()
    }
}

/// Linear reconnection policy
///
/// Attempt `n` (1-based) waits `n * step`; after `max_attempts` failures the
/// channel stays closed until reconnected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Maximum automatic reconnect attempts
    pub max_attempts: u32,

    /// Delay increment per attempt
    #[serde(with = "duration_millis")]
    pub step: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            step: Duration::from_millis(1000),
        }
    }
}

impl ReconnectConfig {
    /// Never reconnect automatically
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            step: Duration::ZERO,
        }
    }

    /// Delay before the given 1-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.step * attempt
    }
}

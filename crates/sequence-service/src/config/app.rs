//! Application configuration for the sequence generation service.

use serde::Deserialize;

use seqgen_engine::EngineConfig;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `SEQGEN_`:
/// - `SEQGEN_HOST`: Server bind address (default: "0.0.0.0")
/// - `SEQGEN_PORT`: Server port (default: 8084)
/// - `SEQGEN_DEBUG`: Enable debug mode (default: false)
/// - `SEQGEN_SERVER_NAME`: Server name for identification
/// - `SEQGEN_SEQUENCE_ATOM_LIMIT`: Largest plan, in atoms, the engine accepts
/// - `SEQGEN_MAX_CYCLE_MINUTES`: Ceiling on an instrument's minimum cycle
/// - `SEQGEN_DEFAULT_FUTURE_LIMIT`: Future atoms returned when no limit is given
/// - `SEQGEN_MAX_FUTURE_LIMIT`: Largest future window a caller may request
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable debug mode
    #[serde(default)]
    pub debug: bool,

    /// Server name for identification
    #[serde(default = "default_server_name")]
    pub server_name: String,

    #[serde(default = "default_sequence_atom_limit")]
    pub sequence_atom_limit: usize,

    #[serde(default = "default_max_cycle_minutes")]
    pub max_cycle_minutes: u64,

    #[serde(default = "default_future_limit")]
    pub default_future_limit: usize,

    #[serde(default = "default_max_future_limit")]
    pub max_future_limit: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8084
}

fn default_server_name() -> String {
    "seqgen-service".to_string()
}

fn default_sequence_atom_limit() -> usize {
    EngineConfig::default().sequence_atom_limit
}

fn default_max_cycle_minutes() -> u64 {
    EngineConfig::default().max_cycle_minutes
}

fn default_future_limit() -> usize {
    EngineConfig::default().default_future_limit
}

fn default_max_future_limit() -> usize {
    EngineConfig::default().max_future_limit
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `SEQGEN_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("SEQGEN_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine limits carried by this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sequence_atom_limit: self.sequence_atom_limit,
            max_cycle_minutes: self.max_cycle_minutes,
            default_future_limit: self.default_future_limit,
            max_future_limit: self.max_future_limit,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            server_name: default_server_name(),
            sequence_atom_limit: default_sequence_atom_limit(),
            max_cycle_minutes: default_max_cycle_minutes(),
            default_future_limit: default_future_limit(),
            max_future_limit: default_max_future_limit(),
        }
    }
}

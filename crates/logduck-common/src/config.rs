//! Configuration for Logduck services

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database initialization configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// External source resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// MCP server configuration
    #[serde(default)]
    pub mcp: McpConfig,

    /// Query policy configuration
    #[serde(default)]
    pub query: QueryConfig,
}

/// Database initialization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Initialization script run against every fresh connection
    #[serde(default = "default_init_script")]
    pub init_script: Option<PathBuf>,

    /// DuckDB memory limit (e.g., "2GB")
    #[serde(default)]
    pub memory_limit: Option<String>,

    /// DuckDB worker thread count
    #[serde(default)]
    pub threads: Option<u32>,
}

fn default_init_script() -> Option<PathBuf> {
    std::env::var_os("LOGDUCK_INIT_SCRIPT").map(PathBuf::from)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            init_script: default_init_script(),
            memory_limit: None,
            threads: None,
        }
    }
}

/// External command used to discover an initialization script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Program to run; it must print the script path on stdout
    #[serde(default = "default_resolver_command")]
    pub command: Option<String>,

    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_resolver_command() -> Option<String> {
    std::env::var("LOGDUCK_RESOLVER_COMMAND").ok()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            command: default_resolver_command(),
            args: Vec::new(),
        }
    }
}

/// MCP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_mcp_port")]
    pub port: u16,

    /// Whether MCP server is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_mcp_port() -> u16 {
    8081
}

fn default_true() -> bool {
    true
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mcp_port(),
            enabled: default_true(),
        }
    }
}

/// Policy applied by the query tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum rows returned by a single query tool call
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Reject statements that are not plain reads
    #[serde(default = "default_true")]
    pub read_only: bool,
}

fn default_max_rows() -> usize {
    1000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            read_only: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, crate::Error> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("logduck").required(false))
            .add_source(config::File::with_name("logduck.local").required(false))
            .add_source(config::Environment::with_prefix("LOGDUCK").separator("__"))
            .build()
            .map_err(|e| crate::Error::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load configuration with defaults (for when config file doesn't exist)
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

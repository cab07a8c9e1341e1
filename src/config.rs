//! Configuration management for mcpilot
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::agent::compaction::CompactionSettings;
use crate::error::{McpilotError, Result};
use crate::mcp::transport::http::{compact_url_for, HttpTransport};
use crate::mcp::transport::stdio::StdioTransport;
use crate::mcp::transport::{Transport, TransportKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Path suffix of the MCP endpoint on an HTTP server
pub const MCP_ENDPOINT_PATH: &str = "/mcp/v1";

/// Main configuration structure for mcpilot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// MCP server connection settings
    #[serde(default)]
    pub mcp: McpConfig,
    /// Agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

/// MCP server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Transport used to reach the server
    #[serde(default)]
    pub mode: TransportKind,

    /// Server executable (stdio mode)
    #[serde(default = "default_server_path")]
    pub server_path: String,

    /// Arguments passed to the server executable (stdio mode)
    #[serde(default)]
    pub server_args: Vec<String>,

    /// Extra environment for the server process (stdio mode)
    #[serde(default)]
    pub server_env: HashMap<String, String>,

    /// Server URL (http mode); scheme and `/mcp/v1` are added when missing
    #[serde(default)]
    pub url: Option<String>,

    /// Bearer token (http mode)
    #[serde(default)]
    pub token: Option<String>,

    /// Use https when the URL has no scheme
    #[serde(default)]
    pub tls: bool,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Remote compaction endpoint; derived from `url` when unset
    #[serde(default)]
    pub compact_url: Option<String>,
}

fn default_server_path() -> String {
    "pgedge-postgres-mcp".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            mode: TransportKind::default(),
            server_path: default_server_path(),
            server_args: Vec::new(),
            server_env: HashMap::new(),
            url: None,
            token: None,
            tls: false,
            timeout_seconds: default_timeout_seconds(),
            compact_url: None,
        }
    }
}

impl McpConfig {
    /// Returns the normalised MCP endpoint
    ///
    /// A missing scheme becomes `https://` when `tls` is set and `http://`
    /// otherwise, and `/mcp/v1` is appended unless already present.
    ///
    /// # Errors
    ///
    /// Returns `McpilotError::Config` when no URL is configured or the
    /// result does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpilot::config::McpConfig;
    ///
    /// let cfg = McpConfig {
    ///     url: Some("db.example.com:8080".to_string()),
    ///     ..McpConfig::default()
    /// };
    /// assert_eq!(cfg.endpoint().unwrap().as_str(), "http://db.example.com:8080/mcp/v1");
    /// ```
    pub fn endpoint(&self) -> Result<url::Url> {
        let raw = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| McpilotError::Config("mcp.url is required for http mode".into()))?;

        let mut url = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else if self.tls {
            format!("https://{}", raw)
        } else {
            format!("http://{}", raw)
        };

        if !url.ends_with(MCP_ENDPOINT_PATH) {
            url = format!("{}{}", url.trim_end_matches('/'), MCP_ENDPOINT_PATH);
        }

        url::Url::parse(&url)
            .map_err(|e| McpilotError::Config(format!("Invalid MCP URL {}: {}", url, e)).into())
    }

    /// Returns the remote compaction endpoint for http mode
    pub fn compact_endpoint(&self) -> Result<url::Url> {
        match self.compact_url.as_deref().filter(|u| !u.is_empty()) {
            Some(raw) => url::Url::parse(raw).map_err(|e| {
                McpilotError::Config(format!("Invalid compact URL {}: {}", raw, e)).into()
            }),
            None => Ok(compact_url_for(&self.endpoint()?)),
        }
    }

    /// Opens the configured transport
    ///
    /// Stdio mode spawns the server process; http mode builds a client and
    /// performs no I/O.
    pub fn connect(&self) -> Result<Arc<dyn Transport>> {
        match self.mode {
            TransportKind::Stdio => {
                tracing::debug!("Starting MCP server {}", self.server_path);
                let transport = StdioTransport::spawn(
                    PathBuf::from(&self.server_path),
                    self.server_args.clone(),
                    self.server_env.clone(),
                    None,
                )?;
                Ok(Arc::new(transport))
            }
            TransportKind::Http => {
                let endpoint = self.endpoint()?;
                tracing::debug!("Using MCP endpoint {}", endpoint);
                let transport = HttpTransport::new(
                    endpoint,
                    self.token.clone(),
                    Duration::from_secs(self.timeout_seconds),
                )?
                .with_compact_url(self.compact_endpoint()?);
                Ok(Arc::new(transport))
            }
        }
    }
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum loop iterations per query
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Tools whose successful execution triggers a tool list refresh
    #[serde(default = "default_state_mutating_tools")]
    pub state_mutating_tools: Vec<String>,

    /// Conversation compaction settings
    #[serde(default)]
    pub compaction: CompactionSettings,

    /// Draw the thinking spinner while waiting on the model
    #[serde(default = "default_show_thinking")]
    pub show_thinking: bool,
}

fn default_max_iterations() -> usize {
    50
}

fn default_state_mutating_tools() -> Vec<String> {
    vec![
        "manage_connections".to_string(),
        "select_database_connection".to_string(),
    ]
}

fn default_show_thinking() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            state_mutating_tools: default_state_mutating_tools(),
            compaction: CompactionSettings::default(),
            show_thinking: default_show_thinking(),
        }
    }
}

impl Config {
    /// Returns the configuration file to use when `--config` is not given
    ///
    /// `config/config.yaml` in the working directory wins when present;
    /// otherwise the per-user location (e.g. `~/.config/mcpilot/config.yaml`).
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("config/config.yaml");
        if local.exists() {
            return local;
        }
        directories::ProjectDirs::from("", "", "mcpilot")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .unwrap_or(local)
    }

    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| McpilotError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| McpilotError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(mode) = std::env::var("MCPILOT_MCP_MODE") {
            match mode.parse() {
                Ok(kind) => self.mcp.mode = kind,
                Err(_) => tracing::warn!("Invalid MCPILOT_MCP_MODE: {}", mode),
            }
        }

        if let Ok(url) = std::env::var("MCPILOT_MCP_URL") {
            self.mcp.url = Some(url);
        }

        if let Ok(token) = std::env::var("MCPILOT_MCP_TOKEN") {
            self.mcp.token = Some(token);
        }

        if let Ok(path) = std::env::var("MCPILOT_SERVER_PATH") {
            self.mcp.server_path = path;
        }

        if let Ok(max) = std::env::var("MCPILOT_MAX_ITERATIONS") {
            if let Ok(value) = max.parse() {
                self.agent.max_iterations = value;
            } else {
                tracing::warn!("Invalid MCPILOT_MAX_ITERATIONS: {}", max);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(mode) = cli.mode {
            self.mcp.mode = mode;
        }
        if let Some(url) = &cli.url {
            self.mcp.url = Some(url.clone());
        }
        if let Some(token) = &cli.token {
            self.mcp.token = Some(token.clone());
        }
        if let Some(path) = &cli.server_path {
            self.mcp.server_path = path.clone();
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that the selected transport has what it needs.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        match self.mcp.mode {
            TransportKind::Stdio => {
                if self.mcp.server_path.trim().is_empty() {
                    return Err(McpilotError::Config(
                        "mcp.server_path is required for stdio mode".to_string(),
                    )
                    .into());
                }
            }
            TransportKind::Http => {
                self.mcp.endpoint()?;
                self.mcp.compact_endpoint()?;
                if self.mcp.timeout_seconds == 0 {
                    return Err(McpilotError::Config(
                        "mcp.timeout_seconds must be greater than 0".to_string(),
                    )
                    .into());
                }
            }
        }

        if self.agent.max_iterations == 0 {
            return Err(
                McpilotError::Config("max_iterations must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.max_iterations > 1000 {
            return Err(McpilotError::Config(
                "max_iterations must be less than or equal to 1000".to_string(),
            )
            .into());
        }

        if self.agent.compaction.recent_window == 0 {
            return Err(McpilotError::Config(
                "compaction.recent_window must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

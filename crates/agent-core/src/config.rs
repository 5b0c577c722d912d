use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logs: LogConfig,
}

impl AppConfig {
    /// Load configuration from default path (~/.config/agent-monitor/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Write the built-in defaults to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn init_at(path: &Path) -> anyhow::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agent-monitor")
            .join("config.toml")
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Bearer token for authentication (None = no auth).
    pub auth_token: Option<String>,
    /// Enable CORS.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3001,
            auth_token: None,
            cors: true,
        }
    }
}

/// Where session logs live and how listings filter them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory of `.jsonl` session logs.
    pub sessions_dir: Option<PathBuf>,
    /// Agent name used to namespace session keys (`agent:<id>:<session>`).
    pub agent_id: String,
    /// Default recency window for listings, in minutes.
    pub window_minutes: u64,
    /// Include archived (`.deleted.`) logs in listings by default.
    pub include_deleted: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sessions_dir: None, // resolved at runtime from agent_id
            agent_id: "main".into(),
            window_minutes: 24 * 60,
            include_deleted: true,
        }
    }
}

impl LogConfig {
    /// The configured sessions directory, or `~/.agents/<agent_id>/sessions`.
    pub fn resolved_sessions_dir(&self) -> PathBuf {
        self.sessions_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".agents")
                .join(&self.agent_id)
                .join("sessions")
        })
    }
}

//! `mcp serve` configuration.
//!
//! Precedence: command-line flag > environment variable > config file > default.
//! The optional config file is YAML (`.yaml` / `.yml`) or JSON (anything else):
//!
//! ```yaml
//! prefix: labctl
//! subprocess: false
//! timeout_secs: 120
//! exclude:
//!   - label.delete
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::registry::parse_path;
use crate::tree::ParsedArgs;

pub const DEFAULT_PREFIX: &str = "labctl";
pub const PREFIX_ENV: &str = "LABCTL_MCP_PREFIX";
pub const CONFIG_ENV: &str = "LABCTL_MCP_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid timeout '{0}': expected a positive number of seconds")]
    Timeout(String),
}

/// On-disk shape of the config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub prefix: Option<String>,
    pub subprocess: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub exclude: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let lower = path.to_string_lossy().to_ascii_lowercase();
        let parsed = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            serde_yaml::from_str::<FileConfig>(&raw).map_err(|e| e.to_string())
        } else {
            serde_json::from_str::<FileConfig>(&raw).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Subprocess,
    InProcess,
}

/// Effective server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub prefix: String,
    pub mode: ExecMode,
    pub timeout: Option<Duration>,
    pub exclude: Vec<Vec<String>>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            mode: ExecMode::InProcess,
            timeout: None,
            exclude: Vec::new(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl ServeConfig {
    /// Resolve from parsed `mcp serve` flags, the environment and the file.
    pub fn resolve(args: &ParsedArgs) -> Result<Self, ConfigError> {
        Self::resolve_with(args, non_empty_env)
    }

    fn resolve_with(
        args: &ParsedArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let config_path = args
            .value("config")
            .map(str::to_string)
            .or_else(|| env(CONFIG_ENV));
        let file = match config_path {
            Some(p) => FileConfig::load(Path::new(&p))?,
            None => FileConfig::default(),
        };

        let prefix = args
            .value("prefix")
            .map(str::to_string)
            .or_else(|| env(PREFIX_ENV))
            .or(file.prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let mode = if args.flag("subprocess") || file.subprocess.unwrap_or(false) {
            ExecMode::Subprocess
        } else {
            ExecMode::InProcess
        };

        let timeout = match args.value("timeout") {
            Some(raw) => Some(parse_timeout(raw)?),
            None => file.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
        };

        let exclude = file
            .exclude
            .iter()
            .map(String::as_str)
            .chain(args.values("exclude").iter().map(String::as_str))
            .map(parse_path)
            .filter(|p| !p.is_empty())
            .collect();

        Ok(ServeConfig {
            prefix,
            mode,
            timeout,
            exclude,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .ok_or_else(|| ConfigError::Timeout(raw.to_string()))
}

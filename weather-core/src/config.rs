use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";
pub const BIND_ADDR_ENV: &str = "WEATHER_BIND_ADDR";
pub const STATIC_DIR_ENV: &str = "WEATHER_STATIC_DIR";
pub const TRUST_PROXY_ENV: &str = "WEATHER_TRUST_PROXY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory holding `index.html` and the assets served under `/static`.
    pub static_dir: PathBuf,
    /// Take the client key from `X-Real-IP` / `X-Forwarded-For` instead of the peer address.
    pub trust_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            static_dir: PathBuf::from("static"),
            trust_proxy: false,
        }
    }
}

/// Upstream provider settings (credential, endpoint, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ProviderConfig {
    /// The credential, unless missing or blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration.
///
/// Example TOML:
/// ```toml
/// [server]
/// bind = "0.0.0.0:8000"
///
/// [provider]
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
}

impl Config {
    /// Resolve configuration from file and process environment.
    ///
    /// An explicit `path` must exist. Without one, the platform config file is
    /// used when present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// [`Config::load`] with environment variables read through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_optional_file(Self::platform_config_file().as_deref())?,
        };

        cfg.apply_env(lookup)?;
        Ok(cfg)
    }

    /// Read `path` if it is given and exists, otherwise start from defaults.
    fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Overlay environment variables, read through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.provider.api_key = Some(key);
        }

        if let Some(bind) = get(BIND_ADDR_ENV) {
            self.server.bind = bind
                .trim()
                .parse()
                .with_context(|| format!("{BIND_ADDR_ENV} must be a socket address, got '{bind}'"))?;
        }

        if let Some(dir) = get(STATIC_DIR_ENV) {
            self.server.static_dir = PathBuf::from(dir);
        }

        if let Some(flag) = get(TRUST_PROXY_ENV) {
            self.server.trust_proxy = parse_flag(&flag)
                .ok_or_else(|| anyhow!("{TRUST_PROXY_ENV} must be true or false, got '{flag}'"))?;
        }

        Ok(())
    }

    /// True when a non-empty provider credential is configured.
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key().is_some()
    }

    /// Path to the platform config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Self::platform_config_file()
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// `None` when the platform has no home directory to resolve against.
    fn platform_config_file() -> Option<PathBuf> {
        ProjectDirs::from("dev", "weather-task", "weather-service")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

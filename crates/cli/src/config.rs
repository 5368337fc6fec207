use netcache_client::{ClientConfig, ProbeConfig, RetryConfig};
use netcache_core::constants::{
    CACHE_SCHEMA_VERSION, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MEMORY_CAPACITY,
    DEFAULT_SNAPSHOT_LIMIT, DEFAULT_TIMEOUT_SECS,
};
use netcache_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const ENV_PREFIX: &str = "NETCACHE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub client: ClientSettings,
    pub cache: CacheSettings,
    pub snapshot: SnapshotSettings,
    pub reachability: ReachabilitySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory of the disk store; defaults to the user cache directory
    pub dir: Option<PathBuf>,
    /// Keep results in memory only, nothing survives the process
    pub memory_only: bool,
    pub memory_capacity: usize,
    pub schema_version: u32,
}

/// How fetched items are reduced to snapshot records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    pub path: Option<PathBuf>,
    pub limit: usize,
    pub id_field: String,
    pub title_field: String,
    pub subtitle_field: Option<String>,
    pub image_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReachabilityMode {
    Always,
    Probe,
}

impl FromStr for ReachabilityMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(ReachabilityMode::Always),
            "probe" => Ok(ReachabilityMode::Probe),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachabilitySettings {
    pub mode: ReachabilityMode,
    /// `host:port` to probe; defaults to the base URL's host
    pub probe_address: Option<String>,
    pub probe_interval_secs: u64,
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.rawg.io/api/".to_string(),
            user_agent: format!("netcache/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_attempts: 1,
            retry_delay_ms: 500,
            headers: BTreeMap::new(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            memory_only: false,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            schema_version: CACHE_SCHEMA_VERSION,
        }
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            path: None,
            limit: DEFAULT_SNAPSHOT_LIMIT,
            id_field: "id".to_string(),
            title_field: "name".to_string(),
            subtitle_field: None,
            image_field: None,
        }
    }
}

impl Default for ReachabilitySettings {
    fn default() -> Self {
        Self {
            mode: ReachabilityMode::Always,
            probe_address: None,
            probe_interval_secs: 30,
            probe_timeout_ms: 3000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load defaults, then the TOML file, then `NETCACHE_*` variables, and validate.
    ///
    /// An explicit `path` must exist; the default path is used only if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::file_not_found(display.clone()),
            _ => ConfigError::parse_error(display.clone(), e.to_string()),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::parse_error(display, e.to_string()))
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("netcache").join("config.toml"))
    }

    /// Override settings from environment variables resolved by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        // Client settings
        if let Some((_, base_url)) = var("BASE_URL") {
            self.client.base_url = base_url;
        }
        if let Some((_, user_agent)) = var("USER_AGENT") {
            self.client.user_agent = user_agent;
        }
        if let Some((name, value)) = var("TIMEOUT_SECS") {
            self.client.timeout_secs = parse_env(&name, value)?;
        }
        if let Some((name, value)) = var("CONNECT_TIMEOUT_SECS") {
            self.client.connect_timeout_secs = parse_env(&name, value)?;
        }
        if let Some((name, value)) = var("MAX_ATTEMPTS") {
            self.client.max_attempts = parse_env(&name, value)?;
        }

        // Cache settings
        if let Some((_, dir)) = var("CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }
        if let Some((name, value)) = var("MEMORY_ONLY") {
            self.cache.memory_only = parse_env(&name, value)?;
        }
        if let Some((name, value)) = var("SCHEMA_VERSION") {
            self.cache.schema_version = parse_env(&name, value)?;
        }
        if let Some((_, path)) = var("SNAPSHOT_PATH") {
            self.snapshot.path = Some(PathBuf::from(path));
        }

        // Reachability
        if let Some((name, value)) = var("REACHABILITY") {
            self.reachability.mode = parse_env(&name, value)?;
        }
        if let Some((_, address)) = var("PROBE_ADDRESS") {
            self.reachability.probe_address = Some(address);
        }

        // Logging settings
        if let Some((_, level)) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some((name, value)) = var("LOG_FORMAT") {
            self.logging.format = parse_env(&name, value)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url()?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid_field(
                "client.base_url",
                "scheme must be http or https",
            ));
        }
        if self.client.user_agent.trim().is_empty() {
            return Err(ConfigError::missing_field("client.user_agent"));
        }
        if self.client.timeout_secs == 0 {
            return Err(ConfigError::out_of_range(
                "client.timeout_secs",
                "0",
                "greater than 0",
            ));
        }
        if self.client.connect_timeout_secs == 0 {
            return Err(ConfigError::out_of_range(
                "client.connect_timeout_secs",
                "0",
                "greater than 0",
            ));
        }
        if !(1..=10).contains(&self.client.max_attempts) {
            return Err(ConfigError::out_of_range(
                "client.max_attempts",
                self.client.max_attempts.to_string(),
                "1..=10",
            ));
        }

        if self.cache.memory_capacity == 0 {
            return Err(ConfigError::out_of_range(
                "cache.memory_capacity",
                "0",
                "greater than 0",
            ));
        }
        if self.snapshot.title_field.trim().is_empty() {
            return Err(ConfigError::missing_field("snapshot.title_field"));
        }

        if self.reachability.mode == ReachabilityMode::Probe
            && self.reachability.probe_interval_secs == 0
        {
            return Err(ConfigError::out_of_range(
                "reachability.probe_interval_secs",
                "0",
                "greater than 0",
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::invalid_field(
                    "logging.level",
                    format!("unknown level '{other}'"),
                ))
            }
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.client.base_url)
            .map_err(|e| ConfigError::invalid_field("client.base_url", e.to_string()))
    }

    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::new(self.base_url()?)
            .with_timeout(Duration::from_secs(self.client.timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.client.connect_timeout_secs))
            .with_user_agent(self.client.user_agent.clone());
        for (name, value) in &self.client.headers {
            config = config.with_header(name.clone(), value.clone());
        }
        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(self.client.max_attempts)
            .with_base_delay(Duration::from_millis(self.client.retry_delay_ms))
    }

    /// Probe settings when probing is enabled
    pub fn probe_config(&self) -> Result<Option<ProbeConfig>, ConfigError> {
        if self.reachability.mode != ReachabilityMode::Probe {
            return Ok(None);
        }

        let address = match &self.reachability.probe_address {
            Some(address) => address.clone(),
            None => {
                let url = self.base_url()?;
                let host = url
                    .host_str()
                    .ok_or_else(|| ConfigError::missing_field("reachability.probe_address"))?;
                let port = url.port_or_known_default().unwrap_or(443);
                format!("{host}:{port}")
            }
        };

        Ok(Some(
            ProbeConfig::new(address)
                .with_interval(Duration::from_secs(self.reachability.probe_interval_secs))
                .with_timeout(Duration::from_millis(self.reachability.probe_timeout_ms)),
        ))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join("netcache")
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot
            .path
            .clone()
            .unwrap_or_else(|| self.cache_dir().join("snapshot.json"))
    }
}

fn parse_env<T: FromStr>(name: &str, value: String) -> Result<T, ConfigError> {
    let parsed = value.trim().parse();
    parsed.map_err(|_| ConfigError::invalid_env_var(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.client.max_attempts, 1);
        assert_eq!(config.cache.schema_version, CACHE_SCHEMA_VERSION);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.reachability.mode, ReachabilityMode::Always);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[client]
base_url = "https://api.example.com/v1/"
max_attempts = 3

[client.headers]
X-Api-Key = "secret"

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.client.base_url, "https://api.example.com/v1/");
        assert_eq!(config.client.max_attempts, 3);
        assert_eq!(config.client.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(
            config.client.headers.get("X-Api-Key").map(String::as_str),
            Some("secret")
        );
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.client.timeout_secs = 5;

        config
            .apply_env(lookup(&[
                ("NETCACHE_TIMEOUT_SECS", "12"),
                ("NETCACHE_MEMORY_ONLY", "true"),
                ("NETCACHE_REACHABILITY", "probe"),
                ("NETCACHE_LOG_FORMAT", "pretty"),
            ]))
            .unwrap();

        assert_eq!(config.client.timeout_secs, 12);
        assert!(config.cache.memory_only);
        assert_eq!(config.reachability.mode, ReachabilityMode::Probe);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup(&[("NETCACHE_MAX_ATTEMPTS", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvVar { ref var_name, .. } if var_name == "NETCACHE_MAX_ATTEMPTS"
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.client.base_url = "ftp://files.example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.client.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.client.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/netcache.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_probe_address_defaults_to_base_url_host() {
        let mut config = Config::default();
        assert!(config.probe_config().unwrap().is_none());

        config.reachability.mode = ReachabilityMode::Probe;
        let probe = config.probe_config().unwrap().unwrap();
        assert_eq!(probe.address, "api.rawg.io:443");
    }

    #[test]
    fn test_snapshot_path_defaults_into_cache_dir() {
        let mut config = Config::default();
        config.cache.dir = Some(PathBuf::from("/var/cache/netcache"));
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/var/cache/netcache/snapshot.json")
        );
    }
}

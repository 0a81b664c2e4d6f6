use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 12_0 like Mac OS X) \
AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/69.0.3497.105 Mobile/15E148 Safari/605.1";

const DEFAULT_SERVERS: &[&str] = &[
    "http://checkip.dyndns.org/plain",
    "http://lawrencegoetz.com/programs/ipinfo/",
    "http://myipnumber.com/my-ip-address.asp",
    "https://api.ipify.org",
    "https://bobborst.com/tools/whatsmyip/",
    "https://canyouseeme.org/",
    "https://check.torproject.org/",
    "https://diagnostic.opendns.com/myip",
    "https://displaymyip.com/",
    "https://geoiptool.com/",
    "https://getmyipaddress.org/",
    "https://httpbin.org/ip",
    "https://icanhazip.com/",
    "https://ifconfig.me/ip",
    "https://ip-adress.com/",
    "https://ip-adress.eu/",
    "https://ipchicken.com/",
    "https://ipecho.net/plain",
    "https://mon-ip.com/en/my-ip/",
    "https://my-ip-address.net/",
    "https://myexternalip.com/raw",
    "https://privateinternetaccess.com/pages/whats-my-ip/",
    "https://tracemyip.org/",
    "https://trackip.net/",
    "https://whatsmydns.net/whats-my-ip-address.html",
    "https://whatsmyip.net/",
    "https://wtfismyip.com/text",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Echo services are low-trust sources, certificate problems should not
    /// block address discovery.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_attempts() -> usize {
    5
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_servers() -> Vec<String> {
    DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            servers: default_servers(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            max_attempts: default_max_attempts(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Settings {
    /// Loads settings from `path` when given. Without a path the default
    /// location is read if it exists, otherwise built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    fn from_file(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            bail!("Configuration lists no servers");
        }
        if self.fetch.timeout_ms == 0 {
            bail!("fetch.timeout_ms must be greater than zero");
        }
        if self.fetch.max_attempts == 0 {
            bail!("fetch.max_attempts must be greater than zero");
        }

        let mut seen = HashSet::new();
        for server in &self.servers {
            if !(server.starts_with("http://") || server.starts_with("https://")) {
                bail!("Server is not an HTTP(S) URL: {}", server);
            }
            if !seen.insert(server.as_str()) {
                bail!("Server listed more than once: {}", server);
            }
        }

        Ok(())
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        #[cfg(unix)]
        {
            PathBuf::from("/etc/ipgetter")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\ProgramData\ipgetter")
        }
    }
}

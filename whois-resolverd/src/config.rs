use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::protocol::{SERVICE_NAME, WHOIS_PORT};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub whois: WhoisConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_drain_interval")]
    pub drain_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Result ids are appended directly, so this normally ends with '/'
    #[serde(default = "default_webhook_base")]
    pub base_url: String,
    /// Call `{base}{id}/ready` instead of `{base}{id}`
    #[serde(default)]
    pub ready_suffix: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Registration is skipped when unset
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Advertised endpoint; derived from hostname and listen port when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_deregister_timeout")]
    pub deregister_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhoisConfig {
    #[serde(default = "default_domain_server")]
    pub domain_server: String,
    #[serde(default = "default_address_server")]
    pub address_server: String,
    #[serde(default = "default_whois_port")]
    pub port: u16,
    #[serde(default = "default_whois_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout for webhook and registry calls
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_listen() -> String {
    "[::]:3000".to_string()
}

fn default_drain_interval() -> u64 {
    1000
}

fn default_webhook_base() -> String {
    "http://localhost:8000/webhook/whois/".to_string()
}

fn default_service_name() -> String {
    SERVICE_NAME.to_string()
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_deregister_timeout() -> u64 {
    5
}

fn default_domain_server() -> String {
    "whois.verisign-grs.com".to_string()
}

fn default_address_server() -> String {
    "whois.arin.net".to_string()
}

fn default_whois_port() -> u16 {
    WHOIS_PORT
}

fn default_whois_timeout() -> u64 {
    30
}

fn default_http_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: default_drain_interval(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_url: default_webhook_base(),
            ready_suffix: false,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_name: default_service_name(),
            endpoint: None,
            heartbeat_interval_secs: default_heartbeat_interval(),
            deregister_timeout_secs: default_deregister_timeout(),
        }
    }
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            domain_server: default_domain_server(),
            address_server: default_address_server(),
            port: default_whois_port(),
            timeout_secs: default_whois_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

impl QueueConfig {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

impl RegistryConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn deregister_timeout(&self) -> Duration {
        Duration::from_secs(self.deregister_timeout_secs)
    }
}

impl WhoisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[default]
    #[serde(rename = "none")]
    None,

    /// SQLite database, keeps registry and catalog across restarts
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./relay.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Storage configuration (optional - defaults to in-memory)
    pub storage: Option<StorageConfig>,

    #[serde(default)]
    pub api: ApiSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the Thanos/Prometheus query endpoint
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// What a sweep does after one application's pipeline fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepPolicy {
    /// Stop the sweep; remaining applications wait for the next tick
    #[default]
    Abort,
    /// Record the failure and carry on with the next application
    Continue,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    #[serde(default)]
    pub on_error: SweepPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            on_error: SweepPolicy::default(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_initial_delay_secs() -> u64 {
    10
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DiscoveryConfig {
    /// Number of reference metrics probed at once
    #[serde(default = "default_discovery_concurrency")]
    pub concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: default_discovery_concurrency(),
        }
    }
}

fn default_discovery_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PublisherConfig {
    #[serde(default)]
    pub queue: QueueTransport,
    #[serde(default)]
    pub topic: TopicTransport,
}

/// Queue-style destination (`metrics-topic`)
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum QueueTransport {
    /// In-process broadcast channel
    #[serde(rename = "none")]
    Channel {
        #[serde(default = "default_queue_name")]
        name: String,
    },

    /// Kafka REST proxy (v2 JSON embedded format)
    KafkaRest {
        url: String,
        #[serde(default = "default_queue_name")]
        topic: String,
    },
}

impl Default for QueueTransport {
    fn default() -> Self {
        QueueTransport::Channel {
            name: default_queue_name(),
        }
    }
}

fn default_queue_name() -> String {
    "metrics-topic".to_string()
}

/// Topic-style destination (`metrics.exchange`, routing key `metrics.<appId>`)
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TopicTransport {
    #[serde(rename = "none")]
    Channel {
        #[serde(default = "default_exchange")]
        name: String,
    },

    /// RabbitMQ management HTTP API
    RabbitHttp {
        url: String,
        #[serde(default = "default_vhost")]
        vhost: String,
        #[serde(default = "default_exchange")]
        exchange: String,
        #[serde(default = "default_rabbit_user")]
        username: String,
        #[serde(default = "default_rabbit_user")]
        password: String,
    },
}

impl Default for TopicTransport {
    fn default() -> Self {
        TopicTransport::Channel {
            name: default_exchange(),
        }
    }
}

fn default_exchange() -> String {
    "metrics.exchange".to_string()
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_rabbit_user() -> String {
    "guest".to_string()
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    /// Overrides RELAY_ADDR/RELAY_PORT when set
    pub bind_addr: Option<SocketAddr>,
    /// Overrides RELAY_TOKEN when set
    pub auth_token: Option<String>,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: None,
            auth_token: None,
            enable_cors: default_enable_cors(),
        }
    }
}

fn default_enable_cors() -> bool {
    true
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

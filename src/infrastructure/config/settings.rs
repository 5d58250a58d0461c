use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Outbound frames buffered per connection before writes apply backpressure
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
    /// How long a delivery may wait on a full outbound buffer before the
    /// session is considered dead
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_channel_buffer() -> usize {
    32
}

fn default_write_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Capacity of the hub's command stream
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_command_buffer() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Identity verification. Without a secret the handshake trusts `user_id`
/// as already authenticated upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwtConfig {
    pub secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    pub fn is_enabled(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// "memory" or "postgres"
    #[serde(default = "default_database_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_database_backend() -> String {
    "memory".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("websocket.channel_buffer", 32)?
            .set_default("websocket.write_timeout_ms", 5000)?
            .set_default("hub.command_buffer", 1024)?
            .set_default("database.backend", "memory")?
            .set_default("log.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, JWT__SECRET, DATABASE__URL, WEBSOCKET__WRITE_TIMEOUT_MS, etc.
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            jwt: JwtConfig::default(),
            websocket: WebSocketConfig::default(),
            hub: HubConfig::default(),
            database: DatabaseConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            channel_buffer: default_channel_buffer(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_buffer: default_command_buffer(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_database_backend(),
            url: None,
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

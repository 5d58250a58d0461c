mod settings;

pub use settings::{
    DatabaseConfig, HubConfig, JwtConfig, LogConfig, ServerConfig, Settings, WebSocketConfig,
};

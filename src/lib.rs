// Infrastructure layer (shared components)
pub mod infrastructure;

pub use infrastructure::auth;
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::postgres;

// Domain layer
pub mod hub;
pub mod store;

// Application layer
pub mod api;
pub mod server;
pub mod websocket;

// Supporting modules
pub mod telemetry;

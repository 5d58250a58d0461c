use std::sync::Arc;

use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::hub::HubHandle;
use crate::store::MessageStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// `None` when no JWT secret is configured
    pub jwt_validator: Option<Arc<JwtValidator>>,
    pub hub: HubHandle,
    pub store: Arc<dyn MessageStore>,
}

impl AppState {
    pub fn new(settings: Settings, hub: HubHandle, store: Arc<dyn MessageStore>) -> Self {
        let jwt_validator = JwtValidator::from_config(&settings.jwt).map(Arc::new);
        if jwt_validator.is_none() {
            tracing::warn!("No JWT secret configured, trusting caller-supplied user ids");
        }

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            hub,
            store,
        }
    }
}

//! Gateway state
//!
//! Application state for the gateway server.

use crate::connection::ConnectionManager;
use crate::presence::PresenceRegistry;
use chat_common::AppConfig;
use chat_service::ServiceContext;
use std::sync::Arc;

/// Shared dependencies of every connection task. Cheap to clone.
#[derive(Clone)]
pub struct GatewayState {
    service_context: Arc<ServiceContext>,
    connection_manager: Arc<ConnectionManager>,
    presence: Arc<PresenceRegistry>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    pub fn new(service_context: ServiceContext, config: AppConfig) -> Self {
        let connection_manager = ConnectionManager::new_shared();
        let presence = Arc::new(PresenceRegistry::new(connection_manager.clone()));
        Self {
            service_context: Arc::new(service_context),
            connection_manager,
            presence,
            config: Arc::new(config),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("presence", &self.presence)
            .field("config", &"AppConfig")
            .finish()
    }
}

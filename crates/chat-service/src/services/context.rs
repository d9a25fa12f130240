//! Service context - dependency container for services

use std::sync::Arc;

use chat_common::auth::JwtService;
use chat_core::{Directory, Store};

/// Everything the services reach out to: the two collaborators and the
/// credential verifier. Cheap to clone.
#[derive(Clone)]
pub struct ServiceContext {
    directory: Arc<dyn Directory>,
    store: Arc<dyn Store>,
    jwt_service: Arc<JwtService>,
}

impl ServiceContext {
    pub fn new(
        directory: Arc<dyn Directory>,
        store: Arc<dyn Store>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            directory,
            store,
            jwt_service,
        }
    }

    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("directory", &"dyn Directory")
            .field("store", &"dyn Store")
            .field("jwt_service", &self.jwt_service)
            .finish()
    }
}

/// Builder for creating ServiceContext
#[derive(Default)]
pub struct ServiceContextBuilder {
    directory: Option<Arc<dyn Directory>>,
    store: Option<Arc<dyn Store>>,
    jwt_service: Option<Arc<JwtService>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> super::error::ServiceResult<ServiceContext> {
        use super::error::ServiceError;

        Ok(ServiceContext::new(
            self.directory
                .ok_or_else(|| ServiceError::validation("directory is required"))?,
            self.store
                .ok_or_else(|| ServiceError::validation("store is required"))?,
            self.jwt_service
                .ok_or_else(|| ServiceError::validation("jwt_service is required"))?,
        ))
    }
}

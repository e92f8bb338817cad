//! Startup assembly: one instance of each domain service, built from a single
//! `ServiceContext` and handed out by reference.

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::service::ServiceContext;

#[derive(Debug)]
pub struct Hub {
    auth: AuthService,
}

impl Hub {
    pub fn assemble(context: &ServiceContext) -> Self {
        Self {
            auth: AuthService::new(context),
        }
    }

    /// Validate `config`, build the default context, and assemble.
    pub fn from_config(config: AppConfig) -> Result<(Self, ServiceContext), ApiError> {
        let context = ServiceContext::from_config(config)?;
        Ok((Self::assemble(&context), context))
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }
}

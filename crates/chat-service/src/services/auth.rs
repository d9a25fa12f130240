//! Connection authentication
//!
//! Resolves the credential presented in the upgrade handshake to a directory
//! profile before the gateway registers anything for the connection.

use chat_core::Profile;
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Authenticate a connection attempt.
    ///
    /// - no (or blank) credential: `AuthMissing`
    /// - bad signature, expiry, or a directory error: `AuthFailure`
    /// - identity unknown to the directory: `InvalidIdentity`
    #[instrument(skip_all)]
    pub async fn authenticate(&self, credential: Option<&str>) -> ServiceResult<Profile> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::AuthMissing)?;

        let claims = self.ctx.jwt_service().verify(token)?;
        let user_id = claims.user_id().map_err(|_| ServiceError::InvalidIdentity)?;

        match self.ctx.directory().resolve_user(user_id).await {
            Ok(Some(profile)) => {
                debug!(user_id = %profile.id, "connection authenticated");
                Ok(profile)
            }
            Ok(None) => {
                warn!(user_id = %user_id, "credential for unknown user");
                Err(ServiceError::InvalidIdentity)
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "directory lookup failed during auth");
                Err(ServiceError::AuthFailure(e.to_string()))
            }
        }
    }
}

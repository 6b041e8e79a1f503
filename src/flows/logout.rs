//! Logout
//!
//! Server-side revocation of a refresh token through the realm logout
//! endpoint.

use crate::core::HttpRequest;
use crate::error::{KeycloakError, KeycloakResult};
use crate::flows::grant::{require, GrantFlowExecutor};
use crate::telemetry::LogContext;

impl GrantFlowExecutor {
    /// Revoke `refresh_token`.
    ///
    /// A token the provider already considers invalid (`invalid_grant`)
    /// counts as logged out.
    pub(crate) async fn revoke_refresh_token(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        refresh_token: &str,
    ) -> KeycloakResult<()> {
        require("realm", realm)?;
        require("client_id", client_id)?;
        require("refresh_token", refresh_token)?;

        let context = LogContext::new()
            .operation("logout")
            .realm(realm)
            .client_id(client_id);

        let mut form = vec![("refresh_token", refresh_token.to_string())];
        let request = self.config.auth_method.apply(
            HttpRequest::post(self.config.logout_endpoint(realm)?),
            &mut form,
            client_id,
            Some(client_secret),
        );

        match self.transport.execute(request.form(&form)).await {
            Ok(_) => {
                self.logger.info("session logged out", &context);
                Ok(())
            }
            Err(KeycloakError::Api(e)) if e.is_error("invalid_grant") => {
                self.logger
                    .info("refresh token already invalid", &context.extra("message", &e.message));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

//! Permission Flow
//!
//! Requesting party token (RPT) through a UMA ticket exchange layered on a
//! password grant.

use crate::error::{ConfigurationError, KeycloakResult};
use crate::flows::grant::{require, GrantFlow, GrantFlowExecutor};
use crate::types::{GrantType, Token, TokenOptions};

impl GrantFlowExecutor {
    /// Log the user in, then exchange the user token for an RPT holding the
    /// requested permissions (`resource#scope` each).
    pub(crate) async fn exchange_permission_ticket(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        username: &str,
        password: &str,
        permissions: &[&str],
    ) -> KeycloakResult<Token> {
        if permissions.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigurationError::MissingRequired {
                field: "permission".to_string(),
            }
            .into());
        }
        require("client_id", client_id)?;

        let user_token = self
            .login(client_id, client_secret, realm, username, password)
            .await?;

        let options = permissions
            .iter()
            .filter(|p| !p.trim().is_empty())
            .fold(
                TokenOptions::new()
                    .grant_type(GrantType::UmaTicket)
                    .client_id(client_id)
                    .client_secret(client_secret)
                    .audience(client_id),
                |options, permission| options.permission(*permission),
            );

        self.request_token(
            "request_permission",
            realm,
            options,
            Some(&user_token.access_token),
        )
        .await
    }
}

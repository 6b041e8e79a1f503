//! Grant Flows
//!
//! Token acquisition and revocation against a realm:
//!
//! - **Grants**: client credentials, password, admin password, refresh token
//!   and the generalized `get_token`
//! - **Permissions**: UMA ticket exchange producing a requesting party token
//! - **Logout**: refresh token revocation

pub mod grant;
pub mod logout;
pub mod permission;

pub use grant::{create_mock_grant_flow, GrantCall, GrantFlow, GrantFlowExecutor, MockGrantFlow};

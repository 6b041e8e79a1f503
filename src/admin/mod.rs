//! Admin Operations
//!
//! Cache control and admin documents of a running provider.

pub mod session;

pub use session::{
    create_mock_session_control, DefaultSessionControl, MockSessionControl, RealmCache,
    SessionControl,
};

//! Keycloak Core Components
//!
//! Transport seam, realm metadata reads and one-time shared setup.

pub mod metadata;
pub mod setup;
pub(crate) mod sync;
pub mod transport;

pub use metadata::*;
pub use setup::*;
pub use transport::*;

//! The `utils` module holds the pieces shared by every layer of the gateway:
//! the error types returned across module boundaries and the logging setup
//! used by the binary and the tests.

pub mod error;
pub mod logging;

pub use error::{BusError, GatewayError, HubError};

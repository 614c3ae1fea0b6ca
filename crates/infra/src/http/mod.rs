//! HTTP transport and authenticated request execution

pub mod executor;
pub mod transport;

pub use executor::{Authentication, RequestExecutor};
pub use transport::{ReqwestTransport, TransportBuilder};

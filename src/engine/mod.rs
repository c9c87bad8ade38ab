//! Upstream engine integration layer.
//!
//! Everything that talks to the business-process engine lives here: the
//! explicit session state and its lifecycle, the bounded-retry request
//! executor, the typed API operations, and the transport seam they are
//! all written against.

pub mod api;
pub mod executor;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod tests;

pub use api::EngineClient;
pub use executor::RequestExecutor;
pub use session::{Credentials, EngineSession, SessionLifecycle};
pub use transport::{EngineTransport, HttpTransport};
pub use types::*;

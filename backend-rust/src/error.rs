//! Connection-level error taxonomy.
//!
//! Everything here is contained: the offending connection is dropped and
//! logged, the accept loop and every other room's data carry on. The only
//! fatal errors in the system are configuration errors at startup.

use std::net::IpAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// Connection from an address with no entry in the node table.
    #[error("connection from unregistered source {0}")]
    UnknownSource(IpAddr),
    /// Reset / IO failure mid-read; that connection's contribution is
    /// abandoned, the current window is untouched.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

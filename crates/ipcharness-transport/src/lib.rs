//! Local socket transport for ipcharness sessions.
//!
//! The harness listens on one Unix domain socket per session. This crate owns
//! that endpoint: bind, blocking and bounded accept, client connect, and
//! generation of collision-resistant endpoint paths.
//!
//! Named pipes are not implemented; on non-Unix targets only the error and
//! stream types are available.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod endpoint;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::IpcStream;

#[cfg(unix)]
pub use endpoint::unique_socket_path;
#[cfg(unix)]
pub use uds::UnixDomainSocket;

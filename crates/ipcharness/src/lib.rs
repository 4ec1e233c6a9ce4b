//! Launch a test process and collect the JSON-RPC payloads it streams back.
//!
//! The harness creates a local socket, starts the test process with the socket
//! path in `TEST_RUN_PIPE`, and reads `content-length` framed JSON-RPC
//! messages until the process signals end of transmission and exits.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain socket endpoint and unique path generation
//! - [`frame`]: header framing, envelope validation and message streams
//! - [`session`]: listener, process supervisor and coordinator (behind `session` feature)
//!
//! ```no_run
//! # #[cfg(all(unix, feature = "session"))]
//! # fn main() -> Result<(), ipcharness::session::HarnessError> {
//! use ipcharness::session::{Coordinator, LaunchSpec};
//!
//! let spec = LaunchSpec::new("python3").args(["-m", "pytest", "tests/"]);
//! match Coordinator::default().run(spec)? {
//!     Some(payloads) => println!("{} payloads", payloads.len()),
//!     None => println!("test process sent nothing"),
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(all(unix, feature = "session")))]
//! # fn main() {}
//! ```

/// Re-export transport types.
pub mod transport {
    pub use ipcharness_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ipcharness_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use ipcharness_session::*;
}

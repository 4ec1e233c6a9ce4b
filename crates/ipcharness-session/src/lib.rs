//! Session orchestration for ipcharness.
//!
//! A session binds a fresh local endpoint, launches the test process with the
//! endpoint path in its environment, collects everything the process writes
//! to the endpoint, and parses it once both sides are done.
//!
//! - [`ChannelListener`] accepts and reads producer connections
//! - [`ProcessSupervisor`] runs the process and raises the [`CompletionFlag`]
//! - [`Coordinator`] runs both concurrently and parses the result

pub mod completion;
pub mod config;
#[cfg(unix)]
pub mod coordinator;
pub mod error;
#[cfg(unix)]
pub mod listener;
pub mod supervisor;
pub mod testid;

pub use completion::CompletionFlag;
pub use config::{SessionConfig, DEFAULT_ENDPOINT_ENV, DEFAULT_ENDPOINT_PREFIX};
#[cfg(unix)]
pub use coordinator::{Coordinator, SessionReport};
pub use error::{HarnessError, LaunchError, LookupError, Result};
#[cfg(unix)]
pub use listener::{ChannelListener, RawSession};
pub use supervisor::{LaunchSpec, ProcessSupervisor, StdioMode};
pub use testid::{absolute_test_id, find_test_line_number, TEST_MARKER_PREFIX};

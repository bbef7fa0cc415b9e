// src/lib.rs

//! spsock - scalability-protocol (SP) socket patterns in pure Rust.
//!
//! A socket owns a dynamic set of peer pipes; a pluggable protocol decides how
//! messages move between those pipes and the application. This crate ships the
//! raw XREQ requester: requests go out to any available REP peer exactly as the
//! application framed them, and replies come back with their request id
//! stripped.

/// Defines custom error types used throughout the library.
pub mod error;
/// Message representation: routing header plus opaque body.
pub mod message;
/// Protocol trait, SP identity constants and the XREQ handler.
pub mod protocol;
/// The host socket: pipes, application queues, options and the public handle.
pub mod socket;

// Re-export core types for user convenience.
pub use error::SpError;
pub use message::Msg;
pub use protocol::{Protocol, ProtocolFactory, ProtocolFlags, ProtocolStats, XReq, XReqFactory};
pub use socket::pipe::PipeEnd;
pub use socket::{Dispatch, PipeId, ProtocolSocket, Socket};

// --- Top-Level Library Information Functions ---

/// Major version number of the library.
const VERSION_MAJOR: i32 = 0;
/// Minor version number of the library.
const VERSION_MINOR: i32 = 1;
/// Patch version number of the library.
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
///
/// # Examples
///
/// ```
/// let (major, minor, patch) = spsock::version();
/// println!("spsock version: {}.{}.{}", major, minor, patch);
/// ```
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

/// Returns the major version number of the library.
pub fn version_major() -> i32 {
  VERSION_MAJOR
}

/// Returns the minor version number of the library.
pub fn version_minor() -> i32 {
  VERSION_MINOR
}

/// Returns the patch version number of the library.
pub fn version_patch() -> i32 {
  VERSION_PATCH
}

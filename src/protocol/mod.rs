//! Pluggable SP protocol handlers and their identity surface.
//!
//! A protocol is the pattern logic (REQ, XREQ, PUB, ...) that sits between
//! a socket's pipes and the application. The socket picks one at creation
//! time through a [`ProtocolFactory`] and drives it through [`Protocol`].

pub mod xreq;

pub use xreq::{XReq, XReqFactory};

use crate::error::SpError;
use crate::socket::{PipeId, ProtocolSocket};
use bitflags::bitflags;
use std::sync::Arc;

// SP protocol numbers: family in the high nibble, role in the low nibble.
pub const PROTO_PAIR: u16 = 1 << 4;
pub const PROTO_PUB: u16 = 2 << 4;
pub const PROTO_SUB: u16 = (2 << 4) | 1;
pub const PROTO_REQ: u16 = 3 << 4;
pub const PROTO_REP: u16 = (3 << 4) | 1;
pub const PROTO_PUSH: u16 = 5 << 4;
pub const PROTO_PULL: u16 = (5 << 4) | 1;
pub const PROTO_SURVEYOR: u16 = (6 << 4) | 2;
pub const PROTO_RESPONDENT: u16 = (6 << 4) | 3;
pub const PROTO_BUS: u16 = 7 << 4;

/// Name the raw requester reports during handshake.
pub const XREQ_NAME: &str = "xreq";

/// Human-readable name of a protocol number, for diagnostics.
pub fn proto_name(number: u16) -> Option<&'static str> {
  match number {
    PROTO_PAIR => Some("pair"),
    PROTO_PUB => Some("pub"),
    PROTO_SUB => Some("sub"),
    PROTO_REQ => Some("req"),
    PROTO_REP => Some("rep"),
    PROTO_PUSH => Some("push"),
    PROTO_PULL => Some("pull"),
    PROTO_SURVEYOR => Some("surveyor"),
    PROTO_RESPONDENT => Some("respondent"),
    PROTO_BUS => Some("bus"),
    _ => None,
  }
}

bitflags! {
    /// Capabilities a protocol reports to its host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProtocolFlags: u8 {
        /// No implicit request/reply correlation; the application owns the routing header.
        const RAW = 0b01;
    }
}

/// Counters a protocol exposes for diagnostics. Values are monotonic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolStats {
  /// Messages handed to the application.
  pub delivered: u64,
  /// Inbound messages discarded for missing routing header.
  pub malformed_dropped: u64,
  /// Messages accepted by a peer pipe.
  pub dispatched: u64,
  /// Times an outbound message was held back because no pipe had capacity.
  pub send_deferred: u64,
  /// Peer errors seen while dispatching.
  pub peer_errors: u64,
}

/// Pattern logic plugged into a socket.
///
/// The host calls `process` (or one of its halves) whenever pipe readiness
/// changes. Implementations must tolerate concurrent calls from several
/// threads and must never block.
pub trait Protocol: Send + Sync + 'static {
  /// Binds the protocol to the socket it operates on. Called once, before
  /// the protocol is shared.
  fn init(&mut self, socket: Arc<dyn ProtocolSocket>);

  /// Runs the receive pipeline, then the send pipeline.
  fn process(&self) {
    self.process_recv();
    self.process_send();
  }

  /// Moves inbound messages from the pipes up to the application.
  fn process_recv(&self);

  /// Moves outbound messages from the application down to the pipes.
  fn process_send(&self);

  fn name(&self) -> &'static str;

  /// This protocol's SP number.
  fn number(&self) -> u16;

  /// SP number of the peer pattern this protocol talks to.
  fn peer_number(&self) -> u16;

  fn flags(&self) -> ProtocolFlags;

  fn is_raw(&self) -> bool {
    self.flags().contains(ProtocolFlags::RAW)
  }

  /// Whether a peer announcing `peer` may be connected. Pure predicate.
  fn valid_peer(&self, peer: u16) -> bool;

  /// A pipe to a peer was attached.
  fn add_endpoint(&self, pipe_id: PipeId);

  /// A pipe to a peer was detached.
  fn rem_endpoint(&self, pipe_id: PipeId);

  /// Applies a pattern-specific option.
  fn set_option(&self, option: i32, _value: &[u8]) -> Result<(), SpError> {
    Err(SpError::UnsupportedOption(option))
  }

  /// Reads a pattern-specific option.
  fn get_option(&self, option: i32) -> Result<Vec<u8>, SpError> {
    Err(SpError::UnsupportedOption(option))
  }

  fn stats(&self) -> ProtocolStats {
    ProtocolStats::default()
  }
}

/// Builds fresh protocol instances, one per socket.
pub trait ProtocolFactory: Send + Sync {
  fn new_protocol(&self) -> Box<dyn Protocol>;
}

// src/socket/mod.rs

pub mod core; // SocketCore: the pipe-owning host a protocol plugs into
pub mod options; // Option constants and SocketOptions
pub mod patterns; // Pipe selection / queue helpers
pub mod pipe; // In-memory pipes and the peer-side PipeEnd
pub mod types; // Public Socket handle

pub use types::Socket;

use crate::message::Msg;

/// Identifier of one attached pipe, unique within its socket.
pub type PipeId = usize;

/// Result of handing a message to a consumer (a peer pipe or the application).
///
/// The consumer gives the message back on failure so the caller decides
/// whether to buffer, retry or drop it.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
  /// The message was accepted.
  Success,
  /// Backpressure: nobody can take the message right now. Come back later.
  NoCapacity(Msg),
  /// The selected peer became unusable mid-operation. Another peer may work.
  PeerError(Msg),
}

/// The host side of a protocol: the socket that owns the pipes, the upward
/// (application receive) queue and the downward (application send) queue.
///
/// Every operation is non-blocking. "None available" is `None`.
pub trait ProtocolSocket: Send + Sync + 'static {
  /// Pulls the next inbound message from any connected peer.
  fn recv_any_pipe(&self) -> Option<Msg>;

  /// Offers a message to the application. `NoCapacity` means the
  /// application is not ready to accept it.
  fn push_up(&self, msg: Msg) -> Dispatch;

  /// Pulls the next message the application queued for sending.
  fn pull_down(&self) -> Option<Msg>;

  /// Sends a message on any writable peer pipe.
  ///
  /// A pipe that produced `PeerError` must not be offered again, since
  /// callers retry the same message until `Success` or `NoCapacity`.
  fn send_any_pipe(&self, msg: Msg) -> Dispatch;
}

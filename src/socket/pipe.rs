// src/socket/pipe.rs

use crate::error::SpError;
use crate::message::Msg;
use crate::socket::core::SocketCore;
use crate::socket::patterns::PushError;
use crate::socket::PipeId;

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::fmt;
use std::sync::Weak;

/// The socket's end of one peer connection.
///
/// Owned by the socket's pipe table; protocols never hold it across calls.
#[derive(Debug)]
pub(crate) struct Pipe {
  id: PipeId,
  peer_protocol: u16,
  // Socket -> peer
  tx: Sender<Msg>,
  // Peer -> socket
  rx: Receiver<Msg>,
}

impl Pipe {
  pub(crate) fn id(&self) -> PipeId {
    self.id
  }

  pub(crate) fn peer_protocol(&self) -> u16 {
    self.peer_protocol
  }

  pub(crate) fn try_send(&self, msg: Msg) -> Result<(), PushError<Msg>> {
    match self.tx.try_send(msg) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(msg)) => Err(PushError::Full(msg)),
      Err(TrySendError::Closed(msg)) => Err(PushError::Closed(msg)),
    }
  }

  /// `Ok(None)` when nothing is queued; `Err(Closed)` once the peer is gone
  /// and everything it sent has been read.
  pub(crate) fn try_recv(&self) -> Result<Option<Msg>, SpError> {
    match self.rx.try_recv() {
      Ok(msg) => Ok(Some(msg)),
      Err(TryRecvError::Empty) => Ok(None),
      Err(TryRecvError::Closed) => Err(SpError::Closed),
    }
  }

  pub(crate) fn close(&self) {
    self.tx.close();
    self.rx.close();
  }
}

/// The peer's end of an in-memory pipe.
///
/// Whatever the peer writes here arrives at the socket's protocol as inbound
/// data; whatever the protocol dispatches to this pipe is read here. Each
/// successful operation tells the socket that the pipe's readiness changed.
/// Dropping the `PipeEnd` disconnects the peer.
pub struct PipeEnd {
  id: PipeId,
  // Peer -> socket
  tx: Sender<Msg>,
  // Socket -> peer
  rx: Receiver<Msg>,
  core: Weak<SocketCore>,
}

impl PipeEnd {
  /// The id the socket knows this pipe by.
  pub fn id(&self) -> PipeId {
    self.id
  }

  /// Writes a message towards the socket without waiting.
  pub fn try_send(&self, msg: Msg) -> Result<(), SpError> {
    match self.tx.try_send(msg) {
      Ok(()) => {
        self.signal_readable();
        Ok(())
      }
      Err(TrySendError::Full(_)) => Err(SpError::PipeFull),
      Err(TrySendError::Closed(_)) => Err(SpError::Closed),
    }
  }

  /// Writes a message towards the socket, waiting for pipe capacity.
  pub async fn send(&self, msg: Msg) -> Result<(), SpError> {
    self.tx.send(msg).await.map_err(|_| SpError::Closed)?;
    self.signal_readable();
    Ok(())
  }

  /// Reads the next message the socket dispatched to this peer, if any.
  pub fn try_recv(&self) -> Result<Option<Msg>, SpError> {
    match self.rx.try_recv() {
      Ok(msg) => {
        self.signal_writable();
        Ok(Some(msg))
      }
      Err(TryRecvError::Empty) => Ok(None),
      Err(TryRecvError::Closed) => Err(SpError::Closed),
    }
  }

  /// Waits for the next message the socket dispatches to this peer.
  pub async fn recv(&self) -> Result<Msg, SpError> {
    let msg = self.rx.recv().await.map_err(|_| SpError::Closed)?;
    self.signal_writable();
    Ok(msg)
  }

  /// Number of dispatched messages waiting to be read by the peer.
  pub fn pending(&self) -> usize {
    self.rx.len()
  }

  fn signal_readable(&self) {
    if let Some(core) = self.core.upgrade() {
      tracing::trace!(pipe_id = self.id, "Pipe readable");
      core.process_recv();
    }
  }

  fn signal_writable(&self) {
    if let Some(core) = self.core.upgrade() {
      tracing::trace!(pipe_id = self.id, "Pipe writable");
      core.process_send();
    }
  }
}

impl Drop for PipeEnd {
  fn drop(&mut self) {
    self.tx.close();
    self.rx.close();
    if let Some(core) = self.core.upgrade() {
      core.detach_pipe(self.id);
    }
  }
}

impl fmt::Debug for PipeEnd {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PipeEnd")
      .field("id", &self.id)
      .field("pending", &self.rx.len())
      .finish_non_exhaustive()
  }
}

/// Creates both ends of a pipe with `hwm` capacity per direction.
pub(crate) fn pipe_pair(
  id: PipeId,
  peer_protocol: u16,
  hwm: usize,
  core: Weak<SocketCore>,
) -> (Pipe, PipeEnd) {
  let hwm = hwm.max(1);
  let (tx_to_peer, rx_from_socket) = bounded::<Msg>(hwm);
  let (tx_to_socket, rx_from_peer) = bounded::<Msg>(hwm);
  let pipe = Pipe {
    id,
    peer_protocol,
    tx: tx_to_peer,
    rx: rx_from_peer,
  };
  let end = PipeEnd {
    id,
    tx: tx_to_socket,
    rx: rx_from_socket,
    core,
  };
  (pipe, end)
}

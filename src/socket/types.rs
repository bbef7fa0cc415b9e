// src/socket/types.rs

use crate::error::SpError;
use crate::message::Msg;
use crate::protocol::{ProtocolFactory, ProtocolStats, XReqFactory};
use crate::socket::core::SocketCore;
use crate::socket::options::SocketOptions;
use crate::socket::patterns::PushError;
use crate::socket::pipe::PipeEnd;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// The public handle for an SP socket.
/// Handles are cloneable and share the same core.
#[derive(Clone)]
pub struct Socket {
  core: Arc<SocketCore>,
}

impl Socket {
  /// Opens a socket running the protocol built by `factory`.
  pub fn new(factory: &dyn ProtocolFactory) -> Self {
    Self::with_options(factory, SocketOptions::default())
  }

  /// Opens a socket with explicit options. HWMs size the application queues.
  pub fn with_options(factory: &dyn ProtocolFactory, options: SocketOptions) -> Self {
    Self {
      core: SocketCore::new(factory, options),
    }
  }

  /// Opens a raw XREQ socket.
  pub fn xreq() -> Self {
    Self::new(&XReqFactory)
  }

  /// Attaches an in-memory pipe to a peer speaking `peer_protocol` and
  /// returns the peer's end of it.
  pub fn connect_peer(&self, peer_protocol: u16) -> Result<PipeEnd, SpError> {
    self.core.attach_pipe(peer_protocol)
  }

  /// Queues a message for sending, respecting `SNDTIMEO` when the send queue
  /// is at its HWM.
  pub async fn send(&self, msg: Msg) -> Result<(), SpError> {
    let timeout_opt: Option<Duration> = self.core.options().sndtimeo;
    match timeout_opt {
      Some(duration) if duration.is_zero() => return self.try_send(msg),
      None => self.core.host().downward().push_item(msg).await?,
      Some(duration) => match timeout(duration, self.core.host().downward().push_item(msg)).await {
        Ok(result) => result?,
        Err(_elapsed) => {
          tracing::debug!(?duration, "Send timed out waiting for queue space");
          return Err(SpError::Timeout);
        }
      },
    }
    self.core.process_send();
    Ok(())
  }

  /// Queues a message for sending without waiting.
  /// Fails with `PipeFull` when the send queue is at its HWM.
  pub fn try_send(&self, msg: Msg) -> Result<(), SpError> {
    match self.core.host().downward().try_push_item(msg) {
      Ok(()) => {
        self.core.process_send();
        Ok(())
      }
      Err(PushError::Full(_)) => Err(SpError::PipeFull),
      Err(PushError::Closed(_)) => Err(SpError::Closed),
    }
  }

  /// Receives the next message, respecting `RCVTIMEO`.
  pub async fn recv(&self) -> Result<Msg, SpError> {
    let rcvtimeo_opt: Option<Duration> = self.core.options().rcvtimeo;
    let pop_future = self.core.host().upward().pop_item();

    let msg = match rcvtimeo_opt {
      Some(duration) if duration.is_zero() => {
        return self.try_recv()?.ok_or(SpError::Timeout);
      }
      Some(duration) => match timeout(duration, pop_future).await {
        Ok(Ok(Some(msg))) => msg,
        Ok(Ok(None)) => return Err(SpError::Closed),
        Ok(Err(e)) => return Err(e),
        Err(_elapsed) => return Err(SpError::Timeout),
      },
      None => pop_future.await?.ok_or(SpError::Closed)?,
    };
    // Room opened upward; let a held-back reply through.
    self.core.process_recv();
    Ok(msg)
  }

  /// Receives a message if one is ready.
  pub fn try_recv(&self) -> Result<Option<Msg>, SpError> {
    let msg = self.core.host().upward().try_pop_item()?;
    if msg.is_some() {
      self.core.process_recv();
    }
    Ok(msg)
  }

  /// Sets a socket or protocol option.
  pub fn set_option(&self, option: i32, value: &[u8]) -> Result<(), SpError> {
    self.core.set_option(option, value)
  }

  /// Gets a socket or protocol option value.
  pub fn get_option(&self, option: i32) -> Result<Vec<u8>, SpError> {
    self.core.get_option(option)
  }

  pub fn protocol_name(&self) -> &'static str {
    self.core.protocol().name()
  }

  pub fn protocol_number(&self) -> u16 {
    self.core.protocol().number()
  }

  pub fn peer_protocol_number(&self) -> u16 {
    self.core.protocol().peer_number()
  }

  pub fn is_raw(&self) -> bool {
    self.core.protocol().is_raw()
  }

  /// Snapshot of the protocol's counters.
  pub fn stats(&self) -> ProtocolStats {
    self.core.stats()
  }

  /// Number of currently attached pipes.
  pub fn pipe_count(&self) -> usize {
    self.core.pipe_count()
  }

  /// Closes the socket. Buffered messages are discarded.
  pub fn close(&self) {
    self.core.close();
  }
}

impl fmt::Debug for Socket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Socket")
      .field("protocol", &self.protocol_name())
      .finish_non_exhaustive()
  }
}

// src/socket/core.rs

use crate::error::SpError;
use crate::message::Msg;
use crate::protocol::{proto_name, Protocol, ProtocolFactory, ProtocolStats};
use crate::socket::options::SocketOptions;
use crate::socket::patterns::{FairQueue, LoadBalancer, PushError};
use crate::socket::pipe::{pipe_pair, Pipe, PipeEnd};
use crate::socket::{Dispatch, PipeId, ProtocolSocket};

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// The pipes and queues a protocol operates on.
///
/// This is what the protocol sees as its `ProtocolSocket`. It never calls back
/// into the protocol, so a protocol may hold its own locks while using it.
pub(crate) struct PipeHost {
  pipes: RwLock<HashMap<PipeId, Arc<Pipe>>>,
  // Rotation used to pick the next pipe to write to
  out_lb: LoadBalancer,
  // Rotation used to pick which pipe to poll first when reading
  in_lb: LoadBalancer,
  // Protocol -> application
  upward: FairQueue<Msg>,
  // Application -> protocol
  downward: FairQueue<Msg>,
  // Pipes dropped during a send whose rem_endpoint is still owed
  closed_pipes: Mutex<Vec<PipeId>>,
}

impl PipeHost {
  fn new(rcvhwm: usize, sndhwm: usize) -> Self {
    Self {
      pipes: RwLock::new(HashMap::new()),
      out_lb: LoadBalancer::new(),
      in_lb: LoadBalancer::new(),
      upward: FairQueue::new(rcvhwm),
      downward: FairQueue::new(sndhwm),
      closed_pipes: Mutex::new(Vec::new()),
    }
  }

  pub(crate) fn upward(&self) -> &FairQueue<Msg> {
    &self.upward
  }

  pub(crate) fn downward(&self) -> &FairQueue<Msg> {
    &self.downward
  }

  fn add_pipe(&self, pipe: Pipe) {
    let id = pipe.id();
    self.pipes.write().insert(id, Arc::new(pipe));
    self.out_lb.add_pipe(id);
    self.in_lb.add_pipe(id);
  }

  /// Removes a pipe from the table. Returns it if it was still attached.
  fn remove_pipe(&self, id: PipeId) -> Option<Arc<Pipe>> {
    let removed = self.pipes.write().remove(&id);
    self.out_lb.remove_pipe(id);
    self.in_lb.remove_pipe(id);
    removed
  }

  fn take_closed_pipes(&self) -> Vec<PipeId> {
    std::mem::take(&mut *self.closed_pipes.lock())
  }

  fn pipe(&self, id: PipeId) -> Option<Arc<Pipe>> {
    self.pipes.read().get(&id).cloned()
  }

  fn pipe_ids(&self) -> Vec<PipeId> {
    self.pipes.read().keys().copied().collect()
  }

  fn pipe_count(&self) -> usize {
    self.pipes.read().len()
  }
}

impl ProtocolSocket for PipeHost {
  fn recv_any_pipe(&self) -> Option<Msg> {
    for pipe_id in self.in_lb.rotation() {
      let Some(pipe) = self.pipe(pipe_id) else {
        continue;
      };
      match pipe.try_recv() {
        Ok(Some(msg)) => {
          tracing::trace!(pipe_id, size = msg.size(), "Received from pipe");
          return Some(msg);
        }
        Ok(None) => {}
        // Peer gone and drained; the PipeEnd drop detaches it.
        Err(_) => {}
      }
    }
    None
  }

  fn push_up(&self, msg: Msg) -> Dispatch {
    match self.upward.try_push_item(msg) {
      Ok(()) => Dispatch::Success,
      // A closed upward queue means the application is gone; hold the message.
      Err(PushError::Full(msg)) | Err(PushError::Closed(msg)) => Dispatch::NoCapacity(msg),
    }
  }

  fn pull_down(&self) -> Option<Msg> {
    self.downward.try_pop_item().ok().flatten()
  }

  fn send_any_pipe(&self, mut msg: Msg) -> Dispatch {
    for pipe_id in self.out_lb.rotation() {
      let Some(pipe) = self.pipe(pipe_id) else {
        continue;
      };
      match pipe.try_send(msg) {
        Ok(()) => {
          tracing::trace!(pipe_id, "Sent on pipe");
          return Dispatch::Success;
        }
        Err(PushError::Full(returned)) => {
          msg = returned;
        }
        Err(PushError::Closed(returned)) => {
          // Whoever removes the pipe owes the disconnect hook. The core runs
          // it once the protocol call that got here has returned.
          if let Some(pipe) = self.remove_pipe(pipe_id) {
            tracing::debug!(pipe_id, "Pipe closed during send, removing from rotation");
            pipe.close();
            self.closed_pipes.lock().push(pipe_id);
          }
          return Dispatch::PeerError(returned);
        }
      }
    }
    Dispatch::NoCapacity(msg)
  }
}

/// A protocol handler bound to its pipes and application queues.
///
/// `SocketCore` is the driver: every readiness change (pipe attached or
/// detached, data arriving, a peer draining its pipe, the application sending
/// or receiving) ends in a call to the protocol's processing entry points.
pub struct SocketCore {
  host: Arc<PipeHost>,
  protocol: Box<dyn Protocol>,
  options: RwLock<SocketOptions>,
  next_pipe_id: AtomicUsize,
  closed: AtomicBool,
}

impl SocketCore {
  /// Creates a core running a fresh protocol instance from `factory`.
  /// Queue bounds come from `options` and are fixed for the socket's lifetime.
  pub fn new(factory: &dyn ProtocolFactory, options: SocketOptions) -> Arc<Self> {
    let host = Arc::new(PipeHost::new(options.rcvhwm, options.sndhwm));
    let mut protocol = factory.new_protocol();
    protocol.init(host.clone());
    tracing::debug!(
      protocol = protocol.name(),
      number = protocol.number(),
      raw = protocol.is_raw(),
      "Socket core created"
    );
    Arc::new(Self {
      host,
      protocol,
      options: RwLock::new(options),
      next_pipe_id: AtomicUsize::new(1),
      closed: AtomicBool::new(false),
    })
  }

  pub fn protocol(&self) -> &dyn Protocol {
    self.protocol.as_ref()
  }

  pub(crate) fn host(&self) -> &PipeHost {
    &self.host
  }

  pub fn options(&self) -> SocketOptions {
    self.options.read().clone()
  }

  pub fn stats(&self) -> ProtocolStats {
    self.protocol.stats()
  }

  pub fn pipe_count(&self) -> usize {
    self.host.pipe_count()
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// Attaches a new in-memory pipe to a peer speaking `peer_protocol`.
  ///
  /// The protocol's compatibility predicate runs first; incompatible peers
  /// are refused before any pipe exists.
  pub fn attach_pipe(self: &Arc<Self>, peer_protocol: u16) -> Result<PipeEnd, SpError> {
    if self.is_closed() {
      return Err(SpError::Closed);
    }
    if !self.protocol.valid_peer(peer_protocol) {
      tracing::debug!(
        protocol = self.protocol.name(),
        peer = peer_protocol,
        peer_name = proto_name(peer_protocol).unwrap_or("unknown"),
        "Refusing incompatible peer"
      );
      return Err(SpError::IncompatiblePeer {
        protocol: self.protocol.name(),
        peer: peer_protocol,
      });
    }

    let hwm = {
      let opts = self.options.read();
      opts.sndhwm.max(opts.rcvhwm)
    };
    let pipe_id = self.next_pipe_id.fetch_add(1, Ordering::Relaxed);
    let (pipe, end) = pipe_pair(pipe_id, peer_protocol, hwm, Arc::downgrade(self));
    tracing::debug!(
      pipe_id,
      peer = pipe.peer_protocol(),
      hwm,
      "Attaching pipe"
    );
    self.host.add_pipe(pipe);
    self.protocol.add_endpoint(pipe_id);
    // A new peer is a new place to send buffered output.
    self.process();
    Ok(end)
  }

  /// Detaches a pipe. Unknown or already detached ids are ignored.
  pub fn detach_pipe(&self, pipe_id: PipeId) {
    if let Some(pipe) = self.host.remove_pipe(pipe_id) {
      tracing::debug!(pipe_id, "Detaching pipe");
      pipe.close();
      self.protocol.rem_endpoint(pipe_id);
    }
  }

  /// Runs both protocol pipelines.
  pub fn process(&self) {
    self.protocol.process();
    self.reap_closed_pipes();
  }

  pub fn process_recv(&self) {
    self.protocol.process_recv();
    self.reap_closed_pipes();
  }

  pub fn process_send(&self) {
    self.protocol.process_send();
    self.reap_closed_pipes();
  }

  /// Delivers `rem_endpoint` for pipes the host dropped while the protocol
  /// was sending. Runs outside any protocol call.
  fn reap_closed_pipes(&self) {
    for pipe_id in self.host.take_closed_pipes() {
      tracing::debug!(pipe_id, "Detaching pipe closed during send");
      self.protocol.rem_endpoint(pipe_id);
    }
  }

  pub fn set_option(&self, option: i32, value: &[u8]) -> Result<(), SpError> {
    let applied = self.options.write().apply(option, value);
    match applied {
      Err(SpError::UnsupportedOption(_)) => self.protocol.set_option(option, value),
      other => other,
    }
  }

  pub fn get_option(&self, option: i32) -> Result<Vec<u8>, SpError> {
    let value = self.options.read().read(option);
    match value {
      Err(SpError::UnsupportedOption(_)) => self.protocol.get_option(option),
      other => other,
    }
  }

  /// Closes the application queues and detaches every pipe.
  /// Messages buffered inside the protocol are discarded with it.
  pub fn close(&self) {
    if self.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    tracing::debug!(protocol = self.protocol.name(), "Closing socket core");
    self.host.upward().close();
    self.host.downward().close();
    for pipe_id in self.host.pipe_ids() {
      self.detach_pipe(pipe_id);
    }
    self.reap_closed_pipes();
  }
}

impl fmt::Debug for SocketCore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SocketCore")
      .field("protocol", &self.protocol.name())
      .field("pipes", &self.host.pipe_count())
      .field("closed", &self.is_closed())
      .finish_non_exhaustive()
  }
}

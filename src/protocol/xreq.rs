// src/protocol/xreq.rs

use crate::message::Msg;
use crate::protocol::{Protocol, ProtocolFactory, ProtocolFlags, ProtocolStats, PROTO_REP, PROTO_REQ, XREQ_NAME};
use crate::socket::{Dispatch, PipeId, ProtocolSocket};

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct XReqStats {
  delivered: AtomicU64,
  malformed_dropped: AtomicU64,
  dispatched: AtomicU64,
  send_deferred: AtomicU64,
  peer_errors: AtomicU64,
}

fn bump(counter: &AtomicU64) {
  counter.fetch_add(1, Ordering::Relaxed);
}

/// The raw requester: the non-retrying half of request/reply.
///
/// Outbound messages go to any writable peer exactly as the application
/// framed them. Inbound replies lose their leading request id before they
/// reach the application. No request tracking, no resends, no timeouts.
///
/// Each direction holds at most one message that has left its source but
/// not reached its destination, guarded by that direction's own lock.
pub struct XReq {
  socket: Option<Arc<dyn ProtocolSocket>>,
  // Reply pulled off a pipe that the application has not accepted yet
  rcv_msg: Mutex<Option<Msg>>,
  // Request pulled from the application that no pipe has accepted yet
  snd_msg: Mutex<Option<Msg>>,
  stats: XReqStats,
}

impl XReq {
  pub fn new() -> Self {
    Self {
      socket: None,
      rcv_msg: Mutex::new(None),
      snd_msg: Mutex::new(None),
      stats: XReqStats::default(),
    }
  }

  /// True while a reply waits for the application to make room.
  pub fn has_pending_recv(&self) -> bool {
    self.rcv_msg.lock().is_some()
  }

  /// True while a request waits for pipe capacity.
  pub fn has_pending_send(&self) -> bool {
    self.snd_msg.lock().is_some()
  }
}

impl Default for XReq {
  fn default() -> Self {
    Self::new()
  }
}

impl Protocol for XReq {
  fn init(&mut self, socket: Arc<dyn ProtocolSocket>) {
    self.socket = Some(socket);
  }

  fn process_recv(&self) {
    let Some(sock) = self.socket.as_deref() else {
      return;
    };
    let mut pending = self.rcv_msg.lock();
    loop {
      let msg = match pending.take() {
        Some(msg) => msg,
        None => {
          let Some(mut msg) = sock.recv_any_pipe() else {
            return;
          };
          match msg.trim_u32() {
            Ok(request_id) => {
              tracing::trace!(request_id, "XREQ stripped request id from reply");
              msg
            }
            Err(e) => {
              bump(&self.stats.malformed_dropped);
              tracing::debug!(error = %e, "XREQ dropping reply without request id");
              continue;
            }
          }
        }
      };

      match sock.push_up(msg) {
        Dispatch::Success => bump(&self.stats.delivered),
        Dispatch::NoCapacity(msg) | Dispatch::PeerError(msg) => {
          tracing::trace!("XREQ application not ready, holding reply");
          *pending = Some(msg);
          return;
        }
      }
    }
  }

  fn process_send(&self) {
    let Some(sock) = self.socket.as_deref() else {
      return;
    };
    let mut pending = self.snd_msg.lock();
    loop {
      let msg = match pending.take() {
        Some(msg) => msg,
        None => match sock.pull_down() {
          Some(msg) => msg,
          None => return,
        },
      };

      // Sent unmolested: the application wrote the routing header.
      match sock.send_any_pipe(msg) {
        Dispatch::Success => bump(&self.stats.dispatched),
        Dispatch::NoCapacity(msg) => {
          bump(&self.stats.send_deferred);
          tracing::trace!("XREQ no pipe capacity, holding request");
          *pending = Some(msg);
          return;
        }
        Dispatch::PeerError(msg) => {
          // The host has dropped the failed pipe; the same request goes to the next one.
          bump(&self.stats.peer_errors);
          tracing::trace!("XREQ peer error, trying another pipe");
          *pending = Some(msg);
        }
      }
    }
  }

  fn name(&self) -> &'static str {
    XREQ_NAME
  }

  fn number(&self) -> u16 {
    PROTO_REQ
  }

  fn peer_number(&self) -> u16 {
    PROTO_REP
  }

  fn flags(&self) -> ProtocolFlags {
    ProtocolFlags::RAW
  }

  fn valid_peer(&self, peer: u16) -> bool {
    peer == PROTO_REP
  }

  // Raw pattern: no per-peer state.
  fn add_endpoint(&self, _pipe_id: PipeId) {}
  fn rem_endpoint(&self, _pipe_id: PipeId) {}

  fn stats(&self) -> ProtocolStats {
    let s = &self.stats;
    ProtocolStats {
      delivered: s.delivered.load(Ordering::Relaxed),
      malformed_dropped: s.malformed_dropped.load(Ordering::Relaxed),
      dispatched: s.dispatched.load(Ordering::Relaxed),
      send_deferred: s.send_deferred.load(Ordering::Relaxed),
      peer_errors: s.peer_errors.load(Ordering::Relaxed),
    }
  }
}

impl fmt::Debug for XReq {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("XReq")
      .field("bound", &self.socket.is_some())
      .field("pending_recv", &self.has_pending_recv())
      .field("pending_send", &self.has_pending_send())
      .field("stats", &self.stats())
      .finish()
  }
}

/// Factory for the XREQ protocol, the raw form of REQ.
#[derive(Debug, Clone, Copy, Default)]
pub struct XReqFactory;

impl ProtocolFactory for XReqFactory {
  fn new_protocol(&self) -> Box<dyn Protocol> {
    Box::new(XReq::new())
  }
}

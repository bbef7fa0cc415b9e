// tests/common.rs
#![allow(dead_code)] // Not every test binary uses every helper

use spsock::protocol::PROTO_REP;
use spsock::socket::options::SocketOptions;
use spsock::{Msg, PipeEnd, Socket, SpError, XReqFactory};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use std::sync::Once;
use std::time::Duration;

use tokio::time::timeout;

static TRACING_INIT: Once = Once::new();

// Setup function to initialize tracing once per test binary.
// Can be overridden by RUST_LOG env variable.
fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "spsock=trace,info";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE)
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_test_writer() // Write to test output capture
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

/// Opens an XREQ socket with default options.
pub fn test_xreq() -> Socket {
  setup_tracing();
  Socket::xreq()
}

/// Opens an XREQ socket with explicit options.
pub fn test_xreq_with(options: SocketOptions) -> Socket {
  setup_tracing();
  Socket::with_options(&XReqFactory, options)
}

/// Attaches a REP peer to the socket.
pub fn rep_peer(socket: &Socket) -> PipeEnd {
  socket.connect_peer(PROTO_REP).expect("REP peer should be accepted")
}

/// Builds a reply the way a REP peer frames it: request id first.
pub fn reply_to(request_id: u32, body: &'static [u8]) -> Msg {
  Msg::from_static(body).with_header_u32(request_id)
}

// Helper for recv with timeout assertion
pub async fn recv_timeout(socket: &Socket, duration: Duration) -> Result<Msg, SpError> {
  match timeout(duration, socket.recv()).await {
    Ok(result) => result,
    Err(_) => Err(SpError::Timeout),
  }
}

// Helper for reading what the socket dispatched to a peer
pub async fn peer_recv_timeout(peer: &PipeEnd, duration: Duration) -> Result<Msg, SpError> {
  match timeout(duration, peer.recv()).await {
    Ok(result) => result,
    Err(_) => Err(SpError::Timeout),
  }
}

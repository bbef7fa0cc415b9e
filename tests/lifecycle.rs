// tests/lifecycle.rs

use spsock::{Msg, SpError};
use std::time::Duration;
mod common;

const LONG_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_close_detaches_pipes_and_refuses_new_ones() {
  let socket = common::test_xreq();
  let peer = common::rep_peer(&socket);
  assert_eq!(socket.pipe_count(), 1);

  socket.close();
  assert_eq!(socket.pipe_count(), 0);
  assert!(matches!(
    socket.connect_peer(spsock::protocol::PROTO_REP),
    Err(SpError::Closed)
  ));

  // The peer sees its pipe closed.
  assert!(matches!(peer.try_send(Msg::from_static(b"late")), Err(SpError::Closed)));
  assert!(matches!(peer.try_recv(), Err(SpError::Closed)));
}

#[tokio::test]
async fn test_close_wakes_pending_recv() {
  let socket = common::test_xreq();
  let waiter = {
    let socket = socket.clone();
    tokio::spawn(async move { socket.recv().await })
  };
  tokio::task::yield_now().await;

  socket.close();
  let result = tokio::time::timeout(LONG_TIMEOUT, waiter)
    .await
    .expect("recv should return after close")
    .expect("recv task panicked");
  assert!(matches!(result, Err(SpError::Closed)));
}

#[tokio::test]
async fn test_send_after_close_fails() {
  let socket = common::test_xreq();
  socket.close();
  assert!(matches!(
    socket.try_send(Msg::from_static(b"x").with_header_u32(1)),
    Err(SpError::Closed)
  ));
  assert!(matches!(
    socket.send(Msg::from_static(b"x").with_header_u32(1)).await,
    Err(SpError::Closed)
  ));
}

#[tokio::test]
async fn test_concurrent_peers_and_application() -> Result<(), SpError> {
  let socket = common::test_xreq();
  let peers: Vec<_> = (0..3).map(|_| common::rep_peer(&socket)).collect();

  const PER_PEER: u32 = 50;
  let mut tasks = Vec::new();
  for (n, peer) in peers.into_iter().enumerate() {
    tasks.push(tokio::spawn(async move {
      // Echo each request back as a reply until the socket goes away.
      let mut echoed = 0;
      while echoed < PER_PEER {
        let request = peer.recv().await?;
        let request_id = request.header_words().next().unwrap_or(n as u32);
        peer
          .send(Msg::from_bytes(request.body_bytes()).with_header_u32(request_id))
          .await?;
        echoed += 1;
      }
      Ok::<_, SpError>(peer)
    }));
  }

  let total = 3 * PER_PEER;
  for id in 0..total {
    socket.send(Msg::from_vec(id.to_be_bytes().to_vec()).with_header_u32(id)).await?;
  }

  let mut bodies = Vec::new();
  for _ in 0..total {
    let reply = common::recv_timeout(&socket, LONG_TIMEOUT).await?;
    assert_eq!(reply.header_len(), 0);
    bodies.push(u32::from_be_bytes(reply.body().try_into().unwrap()));
  }
  bodies.sort_unstable();
  assert_eq!(bodies, (0..total).collect::<Vec<_>>());

  for task in tasks {
    task.await.expect("peer task panicked")?;
  }
  Ok(())
}

// benches/xreq_throughput.rs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use spsock::protocol::PROTO_REP;
use spsock::socket::options::SocketOptions;
use spsock::{Msg, Socket, XReqFactory};

// --- Benchmarking Constants ---
const NUM_MESSAGES: usize = 10_000;
const BENCH_HWM: usize = 100_000;
const MSG_SIZES: [usize; 3] = [16, 256, 4096];

fn bench_socket() -> Socket {
  Socket::with_options(
    &XReqFactory,
    SocketOptions {
      rcvhwm: BENCH_HWM,
      sndhwm: BENCH_HWM,
      ..Default::default()
    },
  )
}

/// One request out, one reply back, NUM_MESSAGES times, all through the
/// non-blocking calls so only the protocol path is measured.
fn xreq_round_trip(c: &mut Criterion) {
  let mut group = c.benchmark_group("xreq_round_trip");
  group.throughput(Throughput::Elements(NUM_MESSAGES as u64));

  for size in MSG_SIZES {
    let payload = vec![0xAB; size];
    group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
      let socket = bench_socket();
      let peer = socket.connect_peer(PROTO_REP).expect("REP peer accepted");
      b.iter(|| {
        for id in 0..NUM_MESSAGES as u32 {
          socket
            .try_send(Msg::from_vec(payload.clone()).with_header_u32(id))
            .expect("send");
          let request = peer.try_recv().expect("peer recv").expect("request dispatched");
          peer
            .try_send(Msg::from_bytes(request.body_bytes()).with_header_u32(id))
            .expect("reply");
          let reply = socket.try_recv().expect("recv").expect("reply delivered");
          black_box(reply);
        }
      });
    });
  }
  group.finish();
}

/// Requests fanned out over several peers without reading them back.
fn xreq_fan_out(c: &mut Criterion) {
  let mut group = c.benchmark_group("xreq_fan_out");
  group.throughput(Throughput::Elements(NUM_MESSAGES as u64));

  for peers in [1usize, 4, 16] {
    group.bench_with_input(BenchmarkId::from_parameter(peers), &peers, |b, &peers| {
      b.iter(|| {
        let socket = bench_socket();
        let ends: Vec<_> = (0..peers)
          .map(|_| socket.connect_peer(PROTO_REP).expect("REP peer accepted"))
          .collect();
        for id in 0..NUM_MESSAGES as u32 {
          socket.try_send(Msg::from_static(b"req").with_header_u32(id)).expect("send");
        }
        black_box(ends.iter().map(|e| e.pending()).sum::<usize>());
      });
    });
  }
  group.finish();
}

criterion_group!(benches, xreq_round_trip, xreq_fan_out);
criterion_main!(benches);

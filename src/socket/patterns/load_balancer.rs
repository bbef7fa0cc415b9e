// src/socket/patterns/load_balancer.rs

use crate::socket::PipeId;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Hands out pipe ids in round-robin order.
///
/// Used for both directions: picking the next pipe to write to, and picking
/// which pipe to poll first when reading so no single peer starves the rest.
#[derive(Debug, Default)]
pub struct LoadBalancer {
  pipes: Mutex<VecDeque<PipeId>>, // VecDeque supports efficient pop_front/push_back
}

impl LoadBalancer {
  /// Creates a new, empty load balancer.
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a pipe to the rotation. Duplicate adds are ignored.
  pub fn add_pipe(&self, pipe_id: PipeId) {
    let mut pipes_guard = self.pipes.lock();
    if !pipes_guard.contains(&pipe_id) {
      pipes_guard.push_back(pipe_id);
      tracing::trace!(pipe_id, "LoadBalancer added pipe");
    }
  }

  /// Removes a pipe from the rotation. Returns true if it was present.
  pub fn remove_pipe(&self, pipe_id: PipeId) -> bool {
    let mut pipes_guard = self.pipes.lock();
    if let Some(pos) = pipes_guard.iter().position(|&id| id == pipe_id) {
      pipes_guard.remove(pos);
      tracing::trace!(pipe_id, "LoadBalancer removed pipe");
      true
    } else {
      false
    }
  }

  /// Snapshot of the rotation, starting at the next pipe to be selected.
  /// Advances the rotation by one so successive scans start at different pipes.
  pub fn rotation(&self) -> Vec<PipeId> {
    let mut pipes_guard = self.pipes.lock();
    let snapshot: Vec<PipeId> = pipes_guard.iter().copied().collect();
    if let Some(first) = pipes_guard.pop_front() {
      pipes_guard.push_back(first);
    }
    snapshot
  }

  pub fn len(&self) -> usize {
    self.pipes.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.pipes.lock().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_robin_over_registered_pipes() {
    let lb = LoadBalancer::new();
    assert!(lb.rotation().is_empty());

    lb.add_pipe(1);
    lb.add_pipe(2);
    lb.add_pipe(2);
    lb.add_pipe(3);
    assert_eq!(lb.len(), 3);

    let firsts: Vec<_> = (0..4).map(|_| lb.rotation()[0]).collect();
    assert_eq!(firsts, vec![1, 2, 3, 1]);

    assert!(lb.remove_pipe(2));
    assert!(!lb.remove_pipe(2));
    assert_eq!(lb.rotation(), vec![3, 1]);
    assert_eq!(lb.rotation(), vec![1, 3]);
  }

  #[test]
  fn rotation_starts_one_later_each_call() {
    let lb = LoadBalancer::new();
    lb.add_pipe(10);
    lb.add_pipe(20);
    assert_eq!(lb.rotation(), vec![10, 20]);
    assert_eq!(lb.rotation(), vec![20, 10]);
    lb.remove_pipe(10);
    lb.remove_pipe(20);
    assert!(lb.rotation().is_empty());
    assert!(lb.is_empty());
  }
}

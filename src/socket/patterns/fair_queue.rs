use crate::error::SpError;
use async_channel::{Receiver, Sender, TryRecvError, TrySendError};

#[derive(Debug, PartialEq, Eq)]
pub enum PushError<T> {
  Full(T),
  Closed(T),
}

/// A bounded queue between a protocol handler and the application.
///
/// The protocol side only ever uses the non-blocking `try_*` calls; the
/// application side may await.
#[derive(Debug)]
pub struct FairQueue<T: Send + 'static> {
  receiver: Receiver<T>,
  sender: Sender<T>,
}

impl<T: Send + 'static> FairQueue<T> {
  /// Creates a new queue with a specific capacity (HWM), at least 1.
  pub fn new(capacity: usize) -> Self {
    let (sender, receiver) = async_channel::bounded(capacity.max(1));
    Self { receiver, sender }
  }

  /// Pushes an item, waiting for space if the queue is full.
  pub async fn push_item(&self, item: T) -> Result<(), SpError> {
    self.sender.send(item).await.map_err(|_| {
      tracing::debug!("FairQueue push on closed queue");
      SpError::Closed
    })
  }

  /// Pops the next item, waiting if the queue is empty.
  /// Returns `None` once the queue is closed and drained.
  pub async fn pop_item(&self) -> Result<Option<T>, SpError> {
    match self.receiver.recv().await {
      Ok(item) => Ok(Some(item)),
      Err(async_channel::RecvError) => Ok(None), // Channel closed
    }
  }

  /// Attempts to push an item without blocking.
  pub fn try_push_item(&self, item: T) -> Result<(), PushError<T>> {
    match self.sender.try_send(item) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(returned_item)) => Err(PushError::Full(returned_item)),
      Err(TrySendError::Closed(returned_item)) => Err(PushError::Closed(returned_item)),
    }
  }

  /// Attempts to pop an item without blocking.
  pub fn try_pop_item(&self) -> Result<Option<T>, SpError> {
    match self.receiver.try_recv() {
      Ok(item) => Ok(Some(item)),
      Err(TryRecvError::Empty) => Ok(None),
      Err(TryRecvError::Closed) => Err(SpError::Closed),
    }
  }

  /// Returns the current number of items in the queue.
  pub fn len(&self) -> usize {
    self.receiver.len()
  }

  /// Returns true if the queue is empty.
  pub fn is_empty(&self) -> bool {
    self.receiver.is_empty()
  }

  pub fn close(&self) {
    self.sender.close();
  }

  pub fn is_closed(&self) -> bool {
    self.sender.is_closed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn try_push_reports_full_and_returns_item() {
    let q = FairQueue::new(1);
    assert_eq!(q.try_push_item(1), Ok(()));
    assert_eq!(q.try_push_item(2), Err(PushError::Full(2)));
    assert_eq!(q.len(), 1);
    assert_eq!(q.try_pop_item(), Ok(Some(1)));
    assert_eq!(q.try_pop_item(), Ok(None));
  }

  #[test]
  fn zero_capacity_is_raised_to_one() {
    let q: FairQueue<u8> = FairQueue::new(0);
    assert_eq!(q.try_push_item(7), Ok(()));
    assert_eq!(q.try_push_item(8), Err(PushError::Full(8)));
  }

  #[test]
  fn closed_queue_drains_then_reports_closed() {
    let q = FairQueue::new(4);
    q.try_push_item("a").unwrap();
    q.close();
    assert!(q.is_closed());
    assert_eq!(q.try_push_item("b"), Err(PushError::Closed("b")));
    assert_eq!(q.try_pop_item(), Ok(Some("a")));
    assert_eq!(q.try_pop_item(), Err(SpError::Closed));
  }

  #[tokio::test]
  async fn pop_item_waits_for_push() {
    let q = std::sync::Arc::new(FairQueue::new(2));
    let q2 = q.clone();
    let waiter = tokio::spawn(async move { q2.pop_item().await });
    q.push_item(42).await.unwrap();
    assert_eq!(waiter.await.unwrap(), Ok(Some(42)));
  }
}

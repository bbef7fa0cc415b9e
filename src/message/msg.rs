use crate::error::SpError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Size in bytes of one routing word in a message header.
pub const HEADER_WORD_SIZE: usize = 4;

/// A message travelling through an SP socket.
///
/// The header carries routing frames as big-endian 32-bit words (request ids,
/// backtrace entries). The body is the application payload and is never
/// touched by the header operations.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Msg {
  header: BytesMut,
  // Bytes keeps clones cheap (reference counted)
  body: Bytes,
}

impl Msg {
  /// Creates an empty message with no header and no body.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a message from a `Vec<u8>` body, taking ownership.
  pub fn from_vec(body: Vec<u8>) -> Self {
    Self {
      header: BytesMut::new(),
      body: Bytes::from(body),
    }
  }

  /// Creates a message from a `bytes::Bytes` body.
  pub fn from_bytes(body: Bytes) -> Self {
    Self {
      header: BytesMut::new(),
      body,
    }
  }

  /// Creates a message from a static byte slice (zero-copy).
  pub fn from_static(body: &'static [u8]) -> Self {
    Self {
      header: BytesMut::new(),
      body: Bytes::from_static(body),
    }
  }

  /// Builder form of [`Msg::prepend_u32`].
  pub fn with_header_u32(mut self, value: u32) -> Self {
    self.prepend_u32(value);
    self
  }

  /// Returns the message body.
  pub fn body(&self) -> &[u8] {
    &self.body
  }

  /// Returns a cheap clone of the body bytes.
  pub fn body_bytes(&self) -> Bytes {
    self.body.clone()
  }

  /// Returns the raw header bytes.
  pub fn header(&self) -> &[u8] {
    &self.header
  }

  /// Number of header bytes.
  pub fn header_len(&self) -> usize {
    self.header.len()
  }

  /// Size of the body in bytes.
  pub fn size(&self) -> usize {
    self.body.len()
  }

  /// Iterates the complete 32-bit words of the header, front first.
  pub fn header_words(&self) -> impl Iterator<Item = u32> + '_ {
    self
      .header
      .chunks_exact(HEADER_WORD_SIZE)
      .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
  }

  /// Pushes `value` onto the front of the header.
  pub fn prepend_u32(&mut self, value: u32) {
    let mut header = BytesMut::with_capacity(HEADER_WORD_SIZE + self.header.len());
    header.put_u32(value);
    header.extend_from_slice(&self.header);
    self.header = header;
  }

  /// Removes and returns the leading header word.
  ///
  /// Fails with [`SpError::HeaderTooShort`] when less than one full word is
  /// present; the message is left untouched in that case.
  pub fn trim_u32(&mut self) -> Result<u32, SpError> {
    if self.header.len() < HEADER_WORD_SIZE {
      return Err(SpError::HeaderTooShort {
        needed: HEADER_WORD_SIZE,
        available: self.header.len(),
      });
    }
    let mut word = self.header.split_to(HEADER_WORD_SIZE);
    Ok(word.get_u32())
  }
}

impl fmt::Debug for Msg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Msg")
      .field("header_len", &self.header.len())
      .field("body", &format!("{} bytes", self.body.len())) // Avoid printing large data
      .finish()
  }
}

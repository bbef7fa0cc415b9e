use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum SpError {
  // --- Framing Errors ---
  #[error("Message header too short: needed {needed} bytes, found {available}")]
  HeaderTooShort { needed: usize, available: usize },

  // --- Flow Control ---
  #[error("No pipe has capacity for the message")]
  PipeFull, // EAGAIN / EWOULDBLOCK equivalent

  #[error("Pipe or socket is closed")]
  Closed,

  // --- Timeouts ---
  #[error("Operation timed out")]
  Timeout, // ETIMEDOUT

  // --- Option Errors ---
  #[error("Invalid value provided for option ID {0}")]
  InvalidOptionValue(i32),
  #[error("Socket option not supported: {0}")]
  UnsupportedOption(i32),

  // --- Protocol Errors ---
  #[error("Peer protocol {peer} is not compatible with {protocol}")]
  IncompatiblePeer { protocol: &'static str, peer: u16 },
}


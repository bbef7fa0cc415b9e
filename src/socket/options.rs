// src/socket/options.rs

use std::time::Duration;

use crate::error::SpError;

// Use values consistent with libzmq where possible
pub const SNDHWM: i32 = 23;
pub const RCVHWM: i32 = 24;
pub const RCVTIMEO: i32 = 27;
pub const SNDTIMEO: i32 = 28;

/// Holds parsed and validated socket-level options.
#[derive(Debug, Clone)]
pub struct SocketOptions {
  // High Water Marks (bounds of the upward / downward queues and of new pipes)
  pub rcvhwm: usize,
  pub sndhwm: usize,
  // Timeouts applied by the async Socket handle
  pub rcvtimeo: Option<Duration>, // None = block forever, Some(0) = non-blocking
  pub sndtimeo: Option<Duration>,
}

impl Default for SocketOptions {
  fn default() -> Self {
    Self {
      rcvhwm: 1000,
      sndhwm: 1000,
      rcvtimeo: None, // -1 in ZMQ
      sndtimeo: None, // -1 in ZMQ
    }
  }
}

impl SocketOptions {
  /// Applies a socket-level option. Returns `UnsupportedOption` for ids the
  /// socket does not own, so the caller can hand them to the protocol.
  pub fn apply(&mut self, option: i32, value: &[u8]) -> Result<(), SpError> {
    match option {
      SNDHWM => self.sndhwm = parse_hwm_option(option, value)?,
      RCVHWM => self.rcvhwm = parse_hwm_option(option, value)?,
      SNDTIMEO => self.sndtimeo = parse_duration_ms_option(option, value)?,
      RCVTIMEO => self.rcvtimeo = parse_duration_ms_option(option, value)?,
      _ => return Err(SpError::UnsupportedOption(option)),
    }
    tracing::debug!(option, "Socket option applied");
    Ok(())
  }

  /// Reads a socket-level option in the same encoding `apply` accepts.
  pub fn read(&self, option: i32) -> Result<Vec<u8>, SpError> {
    let value = match option {
      SNDHWM => self.sndhwm as i32,
      RCVHWM => self.rcvhwm as i32,
      SNDTIMEO => duration_to_ms(self.sndtimeo),
      RCVTIMEO => duration_to_ms(self.rcvtimeo),
      _ => return Err(SpError::UnsupportedOption(option)),
    };
    Ok(value.to_ne_bytes().to_vec())
  }
}

fn duration_to_ms(d: Option<Duration>) -> i32 {
  match d {
    None => -1,
    Some(d) => d.as_millis().min(i32::MAX as u128) as i32,
  }
}

// --- Helper functions for parsing option values ---

/// Parses a byte slice representing an integer option.
/// Native endianness, as in the ZMQ C API.
pub fn parse_i32_option(option: i32, value: &[u8]) -> Result<i32, SpError> {
  let arr: [u8; 4] = value
    .try_into()
    .map_err(|_| SpError::InvalidOptionValue(option))?;
  Ok(i32::from_ne_bytes(arr))
}

/// Parses a high-water mark. Must be at least 1; queues are bounded.
pub fn parse_hwm_option(option: i32, value: &[u8]) -> Result<usize, SpError> {
  match parse_i32_option(option, value)? {
    v if v >= 1 => Ok(v as usize),
    _ => Err(SpError::InvalidOptionValue(option)),
  }
}

/// Parses a timeout in milliseconds. -1 is infinite, 0 is immediate.
pub fn parse_duration_ms_option(option: i32, value: &[u8]) -> Result<Option<Duration>, SpError> {
  match parse_i32_option(option, value)? {
    -1 => Ok(None),
    v @ 0.. => Ok(Some(Duration::from_millis(v as u64))),
    // Negative values other than -1 are invalid for timeouts
    _ => Err(SpError::InvalidOptionValue(option)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timeouts_use_minus_one_for_infinite() {
    let mut opts = SocketOptions::default();
    opts.apply(RCVTIMEO, &(-1i32).to_ne_bytes()).unwrap();
    assert_eq!(opts.rcvtimeo, None);
    opts.apply(RCVTIMEO, &250i32.to_ne_bytes()).unwrap();
    assert_eq!(opts.rcvtimeo, Some(Duration::from_millis(250)));
    assert_eq!(opts.read(RCVTIMEO).unwrap(), 250i32.to_ne_bytes().to_vec());
    assert_eq!(
      opts.apply(SNDTIMEO, &(-5i32).to_ne_bytes()),
      Err(SpError::InvalidOptionValue(SNDTIMEO))
    );
  }

  #[test]
  fn hwm_rejects_zero_and_bad_lengths() {
    let mut opts = SocketOptions::default();
    assert_eq!(
      opts.apply(SNDHWM, &0i32.to_ne_bytes()),
      Err(SpError::InvalidOptionValue(SNDHWM))
    );
    assert_eq!(opts.apply(RCVHWM, &[1, 2]), Err(SpError::InvalidOptionValue(RCVHWM)));
    opts.apply(RCVHWM, &4i32.to_ne_bytes()).unwrap();
    assert_eq!(opts.rcvhwm, 4);
  }

  #[test]
  fn unknown_options_fall_through() {
    let mut opts = SocketOptions::default();
    assert_eq!(
      opts.apply(1001, &1i32.to_ne_bytes()),
      Err(SpError::UnsupportedOption(1001))
    );
    assert_eq!(opts.read(9999), Err(SpError::UnsupportedOption(9999)));
  }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! REQ socket options.
//!
//! Option values travel as raw bytes through the generic
//! [`SocketBase`](crate::SocketBase) interface, the same way they do through a
//! C `setsockopt`: a native-endian `i32`.

use crate::error::{Error, Result};
use std::time::Duration;

/// Resend interval, in milliseconds (`i32`).
pub const RESEND_IVL: i32 = 1;

/// Size of an integer option value.
pub const INT_OPTION_LEN: usize = std::mem::size_of::<i32>();

/// Options understood by the REQ socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    /// See [`RESEND_IVL`].
    ResendInterval,
}

impl SocketOption {
    /// Map a numeric option identifier.
    pub fn from_raw(option: i32) -> Result<Self> {
        match option {
            RESEND_IVL => Ok(Self::ResendInterval),
            other => Err(Error::NotSupported(other)),
        }
    }

    /// Numeric option identifier.
    pub fn as_raw(self) -> i32 {
        match self {
            Self::ResendInterval => RESEND_IVL,
        }
    }
}

/// Decode an integer option value; the slice must be exactly 4 bytes.
pub fn decode_int(value: &[u8]) -> Result<i32> {
    let bytes: [u8; INT_OPTION_LEN] = value.try_into().map_err(|_| {
        Error::invalid(format!(
            "option value is {} bytes, expected {}",
            value.len(),
            INT_OPTION_LEN
        ))
    })?;
    Ok(i32::from_ne_bytes(bytes))
}

/// Encode an integer option value into `out`, returning the bytes written.
pub fn encode_int(value: i32, out: &mut [u8]) -> Result<usize> {
    if out.len() < INT_OPTION_LEN {
        return Err(Error::invalid(format!(
            "option buffer is {} bytes, need {}",
            out.len(),
            INT_OPTION_LEN
        )));
    }
    out[..INT_OPTION_LEN].copy_from_slice(&value.to_ne_bytes());
    Ok(INT_OPTION_LEN)
}

/// Milliseconds option value to a duration. Negative values are rejected.
pub fn millis_to_duration(ms: i32) -> Result<Duration> {
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| Error::invalid(format!("negative interval: {} ms", ms)))
}

/// Duration to a milliseconds option value, saturating at `i32::MAX`.
pub fn duration_to_millis(interval: Duration) -> i32 {
    i32::try_from(interval.as_millis()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_options() {
        assert_eq!(
            SocketOption::from_raw(RESEND_IVL).unwrap(),
            SocketOption::ResendInterval
        );
        assert_eq!(SocketOption::ResendInterval.as_raw(), RESEND_IVL);
        assert!(matches!(
            SocketOption::from_raw(99),
            Err(Error::NotSupported(99))
        ));
    }

    #[test]
    fn int_value_must_be_four_bytes() {
        assert_eq!(decode_int(&250i32.to_ne_bytes()).unwrap(), 250);
        assert!(matches!(decode_int(&[1, 2]), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            decode_int(&[0; 8]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn encode_needs_room() {
        let mut small = [0u8; 3];
        assert!(matches!(
            encode_int(5, &mut small),
            Err(Error::InvalidArgument(_))
        ));

        let mut big = [0u8; 8];
        assert_eq!(encode_int(5, &mut big).unwrap(), 4);
        assert_eq!(decode_int(&big[..4]).unwrap(), 5);
    }

    #[test]
    fn millis_conversions() {
        assert_eq!(millis_to_duration(1500).unwrap(), Duration::from_millis(1500));
        assert!(millis_to_duration(-1).is_err());
        assert_eq!(duration_to_millis(Duration::from_secs(2)), 2000);
        assert_eq!(duration_to_millis(Duration::from_secs(u64::MAX)), i32::MAX);
    }
}

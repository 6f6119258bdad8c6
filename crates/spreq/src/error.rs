// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for REQ socket operations.

use std::fmt;

/// Result type for REQ socket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the REQ socket and its collaborators.
///
/// Raw socket failures other than [`Error::WouldBlock`] never surface from
/// [`Req`](crate::Req): they break the contract between the state machine and
/// the raw socket and abort the operation with a panic instead.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Transient
    // ========================================================================
    /// No reply available yet, or the raw socket applied backpressure.
    ///
    /// Malformed, unmarked and stale replies are also reported this way.
    WouldBlock,
    /// A blocking wait in [`ReqHandle`](crate::ReqHandle) expired.
    Timeout,

    // ========================================================================
    // Misuse
    // ========================================================================
    /// `recv` called with no request outstanding.
    BadState,

    // ========================================================================
    // Configuration
    // ========================================================================
    /// Option value has the wrong size or is out of range.
    InvalidArgument(String),
    /// Option identifier is not known to this socket type.
    NotSupported(i32),

    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// Socket or driver has been closed.
    Closed,
    /// I/O error with underlying cause (driver thread spawn).
    Io(std::io::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Whether the caller is expected to retry the operation later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::WouldBlock | Self::Timeout)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WouldBlock => write!(f, "Operation would block"),
            Self::Timeout => write!(f, "Timed out waiting for reply"),
            Self::BadState => write!(f, "No request in progress"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Self::NotSupported(option) => write!(f, "Option {} not supported", option),
            Self::Closed => write!(f, "Socket closed"),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

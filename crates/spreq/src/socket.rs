// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic socket interface and socket-type registry.
//!
//! Every scalability-protocol pattern socket implements [`SocketBase`]; the
//! application-facing layer holds a `Box<dyn SocketBase>` and never needs to
//! know which pattern it talks to. [`SocketType`] entries map a
//! `(domain, protocol)` pair to a constructor.

use crate::error::Result;
use crate::raw::RawSocket;
use crate::req::Req;

/// Scalability-protocols address family.
pub const AF_SP: i32 = 1;

/// Request/reply protocol family.
pub const PROTO_REQREP: i32 = 3;

/// REQ socket protocol number.
pub const SP_REQ: i32 = PROTO_REQREP * 16;

/// Operations the dispatch layer invokes on a pattern socket.
///
/// Implementations are driven by a single owner; every method takes `&mut`
/// or consumes the socket.
pub trait SocketBase: Send {
    /// Send one message.
    fn send(&mut self, buf: &[u8]) -> Result<()>;

    /// Receive one message into `buf`, returning its full length (which may
    /// exceed `buf.len()` when the message was truncated).
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Set a pattern-specific option.
    fn set_option(&mut self, option: i32, value: &[u8]) -> Result<()>;

    /// Read a pattern-specific option into `value`, returning bytes written.
    fn get_option(&self, option: i32, value: &mut [u8]) -> Result<usize>;

    /// Handle timers that have expired. Returns how many were handled.
    fn process_timers(&mut self) -> usize {
        0
    }

    /// Tear the socket down.
    fn close(self: Box<Self>);
}

/// Constructor entry for one socket type.
#[derive(Debug, Clone, Copy)]
pub struct SocketType {
    /// Address family (always [`AF_SP`] here)
    pub domain: i32,
    /// Protocol number
    pub protocol: i32,
    /// Human readable name
    pub name: &'static str,
    /// Build a socket over a raw socket
    pub create: fn(Box<dyn RawSocket>) -> Box<dyn SocketBase>,
}

impl SocketType {
    /// Instantiate this socket type.
    pub fn create(&self, raw: Box<dyn RawSocket>) -> Box<dyn SocketBase> {
        (self.create)(raw)
    }
}

fn create_req(raw: Box<dyn RawSocket>) -> Box<dyn SocketBase> {
    Box::new(Req::open(raw))
}

/// The REQ socket type.
pub static REQ: SocketType = SocketType {
    domain: AF_SP,
    protocol: SP_REQ,
    name: "req",
    create: create_req,
};

static SOCKET_TYPES: &[&SocketType] = &[&REQ];

/// Look up a socket type by address family and protocol.
pub fn find_socket_type(domain: i32, protocol: i32) -> Option<&'static SocketType> {
    SOCKET_TYPES
        .iter()
        .copied()
        .find(|t| t.domain == domain && t.protocol == protocol)
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # spreq - Scalability-protocol REQ socket
//!
//! The requesting side of the request/reply pattern: every request carries a
//! 31-bit correlation ID, is kept until the matching reply arrives, and is
//! resent on a timer until then. Replies with the wrong ID (late answers to
//! superseded requests) are dropped silently.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use spreq::raw::{MemoryRaw, RawSocket};
//! use spreq::{Req, ReqConfig, ReqDriver, Result};
//!
//! fn main() -> Result<()> {
//!     let (raw, mut peer) = MemoryRaw::pair(16);
//!     let mut handle = ReqDriver::spawn(Req::open(raw), &ReqConfig::default())?;
//!
//!     // A toy REP peer that echoes the tag back with its answer
//!     let responder = std::thread::spawn(move || loop {
//!         if let Ok(request) = peer.recv() {
//!             let mut reply = request[..spreq::wire::TAG_LEN].to_vec();
//!             reply.extend_from_slice(b"pong");
//!             peer.send(&reply).unwrap();
//!             break;
//!         }
//!         std::thread::sleep(Duration::from_millis(1));
//!     });
//!
//!     let reply = handle.request(b"ping", Duration::from_secs(5))?;
//!     assert_eq!(reply, b"pong");
//!     responder.join().unwrap();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  ReqHandle (application thread)      SocketBase (generic dispatch) |
//! +---------------------------------------------------------------------+
//! |  ReqDriver thread: commands in, timers fired, replies out          |
//! +---------------------------------------------------------------------+
//! |  Req state machine: Idle <-> InProgress, IDs, supersession, resend |
//! |     wire (tag codec) | options | timer | entropy | metrics         |
//! +---------------------------------------------------------------------+
//! |  RawSocket: unreliable frame pipe (MemoryRaw, or your transport)   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Req`] | The REQ state machine, single owner, non-blocking |
//! | [`ReqDriver`] / [`ReqHandle`] | Background thread that fires resends and offers blocking calls |
//! | [`RawSocket`] | Transport seam under the socket |
//! | [`SocketBase`] | Pattern-agnostic socket interface |
//! | [`ReqConfig`] | Resend and poll intervals, with `SPREQ_*` environment overrides |
//! | [`ReqMetrics`] | Sent, resent, superseded and discarded counters |

/// Defaults and environment configuration.
pub mod config;
/// Background driver thread and its handle.
pub mod driver;
/// Random seeding of the request ID counter.
pub mod entropy;
/// Error type.
pub mod error;
/// REQ counters.
pub mod metrics;
/// Socket option identifiers and value codecs.
pub mod options;
/// Raw frame sockets.
pub mod raw;
/// The REQ state machine.
pub mod req;
/// Generic socket interface and registry.
pub mod socket;
/// Resend timers and clocks.
pub mod timer;
/// Request tag encoding.
pub mod wire;

pub use config::ReqConfig;
pub use driver::{ReqDriver, ReqHandle};
pub use error::{Error, Result};
pub use metrics::{ReqMetrics, ReqMetricsSnapshot};
pub use options::{SocketOption, RESEND_IVL};
pub use raw::{MemoryRaw, RawSocket};
pub use req::Req;
pub use socket::{find_socket_type, SocketBase, SocketType, AF_SP, SP_REQ};
pub use timer::{DeadlineTimer, Timer};
pub use wire::RequestId;

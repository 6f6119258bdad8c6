// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw request sockets: the unreliable frame pipe under [`Req`](crate::Req).
//!
//! A raw socket moves opaque frames to and from its peer(s) with no
//! correlation. It reports backpressure and "nothing to read" as
//! [`Error::WouldBlock`]; the REQ state machine treats every other error as a
//! broken contract.

use crate::config::DEFAULT_RAW_CAPACITY;
use crate::error::{Error, Result};
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Frame-level send/recv primitive.
pub trait RawSocket: Send {
    /// Hand one frame to the transport. The frame is only borrowed for the
    /// duration of the call.
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Take the next available frame.
    fn recv(&mut self) -> Result<Vec<u8>>;

    /// Release transport resources. Called once at socket termination;
    /// must tolerate repeated calls.
    fn close(&mut self) {}
}

impl<R: RawSocket + ?Sized> RawSocket for Box<R> {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        (**self).recv()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// One end of an in-memory raw socket pair.
///
/// Each direction is a bounded lock-free queue: a full queue refuses frames
/// with `WouldBlock`, which is how tests and simulations model transport
/// backpressure. Endpoints are `Send` and may live on different threads.
///
/// # Example
/// ```
/// use spreq::raw::{MemoryRaw, RawSocket};
///
/// let (mut a, mut b) = MemoryRaw::pair(4);
/// a.send(b"hello").unwrap();
/// assert_eq!(b.recv().unwrap(), b"hello");
/// ```
#[derive(Debug)]
pub struct MemoryRaw {
    tx: Arc<ArrayQueue<Vec<u8>>>,
    rx: Arc<ArrayQueue<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryRaw {
    /// Create two connected endpoints, each direction holding up to
    /// `capacity` frames.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let a_to_b = Arc::new(ArrayQueue::new(capacity));
        let b_to_a = Arc::new(ArrayQueue::new(capacity));

        let a = Self {
            tx: Arc::clone(&a_to_b),
            rx: Arc::clone(&b_to_a),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let b = Self {
            tx: b_to_a,
            rx: a_to_b,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (a, b)
    }

    /// [`pair`](Self::pair) with [`DEFAULT_RAW_CAPACITY`] frames per direction.
    pub fn default_pair() -> (Self, Self) {
        Self::pair(DEFAULT_RAW_CAPACITY)
    }

    /// Frames queued towards this endpoint and not yet received.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Whether `close` has been called on this endpoint.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shared flag observing this endpoint's close state, usable after the
    /// endpoint has been moved into a socket.
    pub fn close_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl RawSocket for MemoryRaw {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.tx.push(frame.to_vec()).map_err(|_| Error::WouldBlock)
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.rx.pop().ok_or(Error::WouldBlock)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

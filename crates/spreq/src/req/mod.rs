// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # REQ socket: request/reply matching and retry
//!
//! Turns a raw, fire-and-forget frame socket into a request/reply exchange:
//! each request is tagged with a correlation ID, kept until its reply
//! arrives, and dispatched again every resend interval until then.
//!
//! ## State machine
//!
//! ```text
//!              send()                    recv() matching reply
//!   +------+ ----------> +------------+ ----------------------> +------+
//!   | Idle |             | InProgress |                         | Idle |
//!   +------+             +------------+ <--+                    +------+
//!                          |    ^   |      | send() supersedes:
//!           timer expires  |    |   +------+ cancel timer, drop old
//!           resend + rearm +----+            request, new ID
//! ```
//!
//! ## Protocol Flow
//!
//! ```text
//! Req                                   Peer
//!   |--- [0x8000002a]"ping" ----------->|   (lost)
//!   |                                    |
//!   |   (resend interval elapses)        |
//!   |--- [0x8000002a]"ping" ----------->|   (same bytes)
//!   |<-- [0x80000029]"old" -------------|   stale ID: dropped
//!   |<-- [0x8000002a]"pong" ------------|   match: delivered
//! ```
//!
//! ## Error handling
//!
//! | Condition | Result |
//! |-----------|--------|
//! | no reply, short frame, unmarked tag, wrong ID | `Err(WouldBlock)` |
//! | `recv` while idle | `Err(BadState)` |
//! | raw socket backpressure on send/resend | absorbed, timer retries |
//! | any other raw socket failure | panic |
//! | resend timer with nothing in progress | panic |
//!
//! ## Example
//!
//! ```
//! use spreq::raw::{MemoryRaw, RawSocket};
//! use spreq::wire;
//! use spreq::Req;
//!
//! let (raw, mut peer) = MemoryRaw::pair(8);
//! let mut req = Req::open(raw);
//!
//! req.send(b"ping").unwrap();
//!
//! // Peer echoes the tag with its answer
//! let request = peer.recv().unwrap();
//! let mut reply = request[..wire::TAG_LEN].to_vec();
//! reply.extend_from_slice(b"pong");
//! peer.send(&reply).unwrap();
//!
//! assert_eq!(req.recv().unwrap(), b"pong");
//! ```

use crate::config::{self, ReqConfig, MAX_RESEND_IVL_MS};
use crate::entropy::{self, EntropySource, SystemEntropy};
use crate::error::{Error, Result};
use crate::metrics::ReqMetrics;
use crate::options::{self, SocketOption};
use crate::raw::RawSocket;
use crate::socket::SocketBase;
use crate::timer::{DeadlineTimer, Timer, TimerHandle};
use crate::wire::{self, FrameError, RequestId, TAG_LEN};
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The in-flight request.
#[derive(Debug)]
struct PendingRequest {
    id: RequestId,
    /// Tagged frame, exactly as dispatched
    frame: Box<[u8]>,
    timer: TimerHandle,
    resends: u64,
}

#[derive(Debug)]
enum ReqState {
    Idle,
    InProgress(PendingRequest),
}

/// REQ socket over a raw socket `R`, timed by `T`.
///
/// At most one request is in flight. Dropping the socket cancels the resend
/// timer, releases the pending request and closes the raw socket.
pub struct Req<R: RawSocket, T: Timer = DeadlineTimer> {
    raw: R,
    timer: T,
    /// ID of the most recent request (seed value before the first send)
    last_id: RequestId,
    state: ReqState,
    resend_interval: Duration,
    metrics: Arc<ReqMetrics>,
}

impl<R: RawSocket> Req<R> {
    /// Open a REQ socket with the system clock, system entropy and default
    /// configuration.
    pub fn open(raw: R) -> Self {
        Self::with_config(raw, &ReqConfig::default())
    }

    /// Open a REQ socket with the system clock and entropy, taking the
    /// resend interval from `config` (see [`ReqConfig::from_env`]).
    pub fn with_config(raw: R, config: &ReqConfig) -> Self {
        Self::with_parts(raw, DeadlineTimer::new(), &mut SystemEntropy::new(), config)
    }
}

impl<R: RawSocket, T: Timer> Req<R, T> {
    /// Open a REQ socket from explicit collaborators.
    ///
    /// The ID counter is seeded from `entropy` and masked to 31 bits. A
    /// resend interval above [`MAX_RESEND_IVL_MS`] is clamped to it.
    pub fn with_parts(
        raw: R,
        timer: T,
        entropy: &mut dyn EntropySource,
        config: &ReqConfig,
    ) -> Self {
        let last_id = RequestId::new(entropy::seed_u32(entropy));
        let resend_interval = match config::check_resend_interval(config.resend_interval) {
            Ok(()) => config.resend_interval,
            Err(e) => {
                log::warn!("[req] {}, clamping", e);
                Duration::from_millis(MAX_RESEND_IVL_MS)
            }
        };
        log::debug!(
            "[req] Opened, id seed {} resend interval {:?}",
            last_id,
            resend_interval
        );

        Self {
            raw,
            timer,
            last_id,
            state: ReqState::Idle,
            resend_interval,
            metrics: Arc::new(ReqMetrics::new()),
        }
    }

    /// Send a request, superseding any request still in progress.
    ///
    /// Never blocks and never reports backpressure: a frame the raw socket
    /// refuses is delivered by the resend timer instead.
    ///
    /// # Panics
    /// If the raw socket fails with anything other than `WouldBlock`.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if let ReqState::InProgress(old) = mem::replace(&mut self.state, ReqState::Idle) {
            self.timer.cancel(old.timer);
            self.metrics.increment_requests_superseded();
            log::debug!(
                "[req] Request {} superseded after {} resends",
                old.id,
                old.resends
            );
        }

        self.last_id = self.last_id.next();
        let id = self.last_id;
        let frame = wire::encode_request(id, payload);

        dispatch(&mut self.raw, &self.metrics, id, &frame);
        self.metrics.increment_requests_sent();

        let timer = self.timer.start(self.resend_interval);
        self.state = ReqState::InProgress(PendingRequest {
            id,
            frame,
            timer,
            resends: 0,
        });

        log::trace!("[req] Sent request {} ({} bytes)", id, payload.len());
        Ok(())
    }

    /// Receive the reply to the pending request.
    ///
    /// Returns `WouldBlock` when no reply is available yet; replies that are
    /// malformed or belong to another request are dropped and reported the
    /// same way.
    pub fn recv(&mut self) -> Result<Vec<u8>> {
        let mut frame = self.take_reply()?;
        frame.drain(..TAG_LEN);
        Ok(frame)
    }

    /// Receive the reply into `buf`.
    ///
    /// Copies at most `buf.len()` bytes and returns the full reply length,
    /// so a return value larger than `buf.len()` signals truncation.
    pub fn recv_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let frame = self.take_reply()?;
        let body = &frame[TAG_LEN..];
        let n = body.len().min(buf.len());
        buf[..n].copy_from_slice(&body[..n]);
        Ok(body.len())
    }

    /// Pull one frame from the raw socket and, if it answers the pending
    /// request, complete it and return the whole frame.
    fn take_reply(&mut self) -> Result<Vec<u8>> {
        let pending_id = match &self.state {
            ReqState::InProgress(pending) => pending.id,
            ReqState::Idle => return Err(Error::BadState),
        };

        let frame = match self.raw.recv() {
            Ok(frame) => frame,
            Err(Error::WouldBlock) => return Err(Error::WouldBlock),
            Err(e) => fatal(format_args!("raw socket recv failed: {}", e)),
        };

        match wire::decode_reply(&frame) {
            Ok((id, _)) if id == pending_id => {}
            Ok((id, _)) => {
                self.metrics.increment_replies_stale();
                log::debug!(
                    "[req] Dropping reply for {} (waiting for {})",
                    id,
                    pending_id
                );
                return Err(Error::WouldBlock);
            }
            Err(e) => {
                match e {
                    FrameError::TooShort(_) => self.metrics.increment_replies_malformed(),
                    FrameError::Unmarked(_) => self.metrics.increment_replies_unmarked(),
                }
                log::debug!("[req] Dropping reply: {}", e);
                return Err(Error::WouldBlock);
            }
        }

        if let ReqState::InProgress(done) = mem::replace(&mut self.state, ReqState::Idle) {
            self.timer.cancel(done.timer);
            log::trace!(
                "[req] Request {} answered after {} resends",
                done.id,
                done.resends
            );
        }
        self.metrics.increment_replies_matched();
        Ok(frame)
    }

    /// Handle every expired resend timer. Returns how many fired.
    ///
    /// Expiries are collected before any is handled, so a zero resend
    /// interval resends once per call rather than spinning.
    pub fn process_timers(&mut self) -> usize {
        let mut expired = Vec::new();
        while let Some(handle) = self.timer.poll_expired() {
            expired.push(handle);
        }
        for &handle in &expired {
            self.resend(handle);
        }
        expired.len()
    }

    fn resend(&mut self, handle: TimerHandle) {
        let pending = match &mut self.state {
            ReqState::InProgress(pending) if pending.timer == handle => pending,
            _ => fatal(format_args!(
                "resend timer {:?} fired with no matching request in progress",
                handle
            )),
        };

        dispatch(&mut self.raw, &self.metrics, pending.id, &pending.frame);
        pending.resends += 1;
        pending.timer = self.timer.start(self.resend_interval);
        self.metrics.increment_resends();

        log::debug!(
            "[req] Resent request {} (attempt {})",
            pending.id,
            pending.resends + 1
        );
    }

    /// Set a socket option from its raw byte value.
    pub fn set_option(&mut self, option: i32, value: &[u8]) -> Result<()> {
        match SocketOption::from_raw(option)? {
            SocketOption::ResendInterval => {
                let ms = options::decode_int(value)?;
                self.resend_interval = options::millis_to_duration(ms)?;
                Ok(())
            }
        }
    }

    /// Read a socket option into `value`, returning the bytes written.
    pub fn get_option(&self, option: i32, value: &mut [u8]) -> Result<usize> {
        match SocketOption::from_raw(option)? {
            SocketOption::ResendInterval => {
                options::encode_int(options::duration_to_millis(self.resend_interval), value)
            }
        }
    }

    /// Change the resend interval. An already armed timer keeps its deadline.
    ///
    /// Intervals above [`MAX_RESEND_IVL_MS`] are rejected with
    /// `InvalidArgument` and leave the current value in place.
    pub fn set_resend_interval(&mut self, interval: Duration) -> Result<()> {
        config::check_resend_interval(interval)?;
        self.resend_interval = interval;
        Ok(())
    }

    /// Interval used when the resend timer is next armed.
    pub fn resend_interval(&self) -> Duration {
        self.resend_interval
    }

    /// Whether a request is waiting for its reply.
    pub fn is_in_progress(&self) -> bool {
        matches!(self.state, ReqState::InProgress(_))
    }

    /// ID of the most recent request, or the seed before the first send.
    pub fn current_id(&self) -> RequestId {
        self.last_id
    }

    /// Deadline of the armed resend timer.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.timer.next_deadline()
    }

    /// Shared counters for this socket.
    pub fn metrics(&self) -> &Arc<ReqMetrics> {
        &self.metrics
    }

    /// The timer service arming resends.
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Close the socket. Equivalent to dropping it.
    pub fn close(self) {
        drop(self);
    }
}

impl<R: RawSocket, T: Timer> Drop for Req<R, T> {
    fn drop(&mut self) {
        if let ReqState::InProgress(pending) = mem::replace(&mut self.state, ReqState::Idle) {
            self.timer.cancel(pending.timer);
            log::debug!("[req] Closed with request {} in progress", pending.id);
        }
        self.raw.close();
    }
}

impl<R: RawSocket, T: Timer> SocketBase for Req<R, T> {
    fn send(&mut self, buf: &[u8]) -> Result<()> {
        Req::send(self, buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.recv_into(buf)
    }

    fn set_option(&mut self, option: i32, value: &[u8]) -> Result<()> {
        Req::set_option(self, option, value)
    }

    fn get_option(&self, option: i32, value: &mut [u8]) -> Result<usize> {
        Req::get_option(self, option, value)
    }

    fn process_timers(&mut self) -> usize {
        Req::process_timers(self)
    }

    fn close(self: Box<Self>) {
        drop(self);
    }
}

/// Hand a frame to the raw socket, absorbing backpressure.
fn dispatch<R: RawSocket>(raw: &mut R, metrics: &ReqMetrics, id: RequestId, frame: &[u8]) {
    match raw.send(frame) {
        Ok(()) => {}
        Err(Error::WouldBlock) => {
            metrics.increment_send_backpressure();
            log::debug!("[req] Backpressure on request {}, resend timer will retry", id);
        }
        Err(e) => fatal(format_args!("raw socket send failed for request {}: {}", id, e)),
    }
}

#[cold]
fn fatal(msg: std::fmt::Arguments<'_>) -> ! {
    log::error!("[req] {}", msg);
    panic!("{}", msg);
}
